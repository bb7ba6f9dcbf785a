//! Loading, validating and rewriting a real CMS `settings.php`

mod common;

use cfgtree::{
    ConfigLoader, ConfigNode, ConfigPath, Error, Format, JsonFormat, PhpFormat, ScalarType,
    SchemaValidator, ValidationErrorKind, ValidationResult, cms,
};
use common::{TestFixture, cms_validator, settings_php_source, settings_tree};
use serde::Deserialize;

// =============================================================================
// Reading values
// =============================================================================

#[test]
fn test_fixture_values() {
    common::init_logging();
    let tree = settings_tree();

    assert_eq!(
        tree.root().keys().collect::<Vec<_>>(),
        vec!["BE", "DB", "EXTCONF", "EXTENSIONS", "FE", "GFX", "LOG", "MAIL", "SYS"]
    );
    assert_eq!(tree.get_str("GFX.processor_colorspace").unwrap(), "RGB");
    assert_eq!(tree.get_str("GFX.processor_path").unwrap(), "/usr/bin/");
    assert_eq!(tree.get_i64("SYS.displayErrors").unwrap(), -1);
    assert_eq!(tree.get_i64("DB.Connections.Default.port").unwrap(), 3306);
    assert!(!tree.get_bool("BE.installToolPassword").unwrap());
    assert_eq!(tree.get_i64("EXTENSIONS.faq_t3demo.pid").unwrap(), 36);

    let maintainers = tree.get_sequence("SYS.systemMaintainers").unwrap();
    assert_eq!(maintainers, &[ConfigNode::from(1), ConfigNode::from(3)]);

    let options = tree.get_mapping("BE.passwordHashing.options").unwrap();
    assert!(options.is_empty());

    // the class name keeps exactly one backslash per separator
    assert_eq!(
        tree.get_str("BE.passwordHashing.className").unwrap(),
        "TYPO3\\CMS\\Core\\Crypto\\PasswordHashing\\Argon2iPasswordHash"
    );
    assert_eq!(
        tree.get_str("EXTENSIONS.backend.loginFootnote").unwrap(),
        "TYPO3 made with ❤ by b13"
    );
}

#[test]
fn test_keys_containing_dots_and_backslashes() {
    let tree = settings_tree();

    let features = tree.get_mapping("SYS.features").unwrap();
    assert_eq!(
        features.get("felogin.extbase"),
        Some(&ConfigNode::from(true))
    );
    // an unescaped dot splits the key
    assert!(matches!(
        tree.get("SYS.features.felogin.extbase"),
        Err(Error::PathNotFound(_))
    ));
    assert!(tree.get_bool("SYS.features.felogin\\.extbase").unwrap());
    let path = ConfigPath::new(["SYS", "features", "felogin.extbase"]);
    assert!(tree.get_bool(&path).unwrap());
    assert_eq!(path.to_string(), "SYS.features.felogin\\.extbase");

    let writer = ConfigPath::new([
        "LOG",
        "writerConfiguration",
        "warning",
        "TYPO3\\CMS\\Core\\Log\\Writer\\FileWriter",
        "disabled",
    ]);
    assert!(tree.get_bool(&writer).unwrap());
}

#[test]
fn test_type_errors_are_reported() {
    let tree = settings_tree();

    let err = tree
        .get_scalar("SYS.systemMaintainers", ScalarType::Integer)
        .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { ref path, .. } if path == "SYS.systemMaintainers"));

    let err = tree.get_str("SYS.displayErrors").unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { ref expected, .. } if expected == "string"));

    // an intermediate scalar names the prefix that stopped the walk
    let err = tree.get("SYS.sitename.length").unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { ref path, .. } if path == "SYS.sitename"));

    assert!(tree.get("SYS.missing").unwrap_err().is_not_found());
}

#[test]
fn test_typed_section() {
    #[derive(Debug, Deserialize)]
    struct Connection {
        driver: String,
        host: String,
        port: u16,
        dbname: String,
    }

    #[derive(Debug, Deserialize)]
    struct Mail {
        transport: String,
        transport_sendmail_command: String,
    }

    let tree = settings_tree();

    let conn: Connection = tree.get_as("DB.Connections.Default").unwrap();
    assert_eq!(conn.driver, "mysqli");
    assert_eq!(conn.host, "database");
    assert_eq!(conn.port, 3306);
    assert_eq!(conn.dbname, "cmscore-typo3");

    let mail: Mail = tree.get_as("MAIL").unwrap();
    assert_eq!(mail.transport, "sendmail");
    assert_eq!(mail.transport_sendmail_command, "/usr/sbin/sendmail -t -i");

    let timeout: i64 = tree.get_or("DB.Connections.Default.timeout", 30).unwrap();
    assert_eq!(timeout, 30);

    let err = tree.get_as::<u16>("DB.Connections.Default.host").unwrap_err();
    assert!(matches!(err, Error::InvalidValue { .. }));
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_fixture_passes_cms_rules() {
    let tree = settings_tree();
    let validator = cms_validator();

    let result = validator.validate(&tree);
    assert!(result.is_valid(), "unexpected errors: {:?}", result.errors());
}

#[test]
fn test_fixture_passes_strict_cms_rules() {
    let tree = settings_tree();
    let validator = SchemaValidator::for_schema::<cms::CmsSchema>()
        .unwrap()
        .strict(true);

    let result = validator.validate(&tree);
    assert!(result.is_valid(), "unexpected errors: {:?}", result.errors());
}

#[test]
fn test_strict_mode_flags_uncovered_key() {
    let source = settings_php_source().replacen(
        "'debug' => false,",
        "'debug' => false,\n        'legacyLogin' => true,",
        1,
    );
    let tree = ConfigLoader::default().load_str(&source).unwrap();
    let validator = SchemaValidator::for_schema::<cms::CmsSchema>()
        .unwrap()
        .strict(true);

    let result = validator.validate(&tree);
    let errors = result.errors();
    assert_eq!(errors.len(), 1, "unexpected errors: {errors:?}");
    assert_eq!(errors[0].path.to_string(), "BE.legacyLogin");
    assert_eq!(errors[0].kind, ValidationErrorKind::UnknownKey);
}

#[test]
fn test_bad_colorspace_is_rejected_with_all_errors() {
    let source = settings_php_source()
        .replace("'processor_colorspace' => 'RGB'", "'processor_colorspace' => 'XYZ'")
        .replace("'port' => 3306", "'port' => 70000");

    let loader = ConfigLoader::default();
    let err = loader
        .load_str_validated(&source, &cms_validator())
        .unwrap_err();

    let Error::Validation(errors) = err else {
        panic!("expected validation error, got {err:?}");
    };
    let paths: Vec<String> = errors.iter().map(|e| e.path.to_string()).collect();
    assert_eq!(
        paths,
        vec!["DB.Connections.Default.port", "GFX.processor_colorspace"]
    );
    assert!(matches!(
        errors.0[1].kind,
        ValidationErrorKind::NotAllowed { ref value, .. } if value == "\"XYZ\""
    ));
}

#[test]
fn test_free_validate_function() {
    let tree = settings_tree();
    let result = cfgtree::validate(&tree, &cms::rules()).unwrap();
    assert_eq!(result, ValidationResult::Valid);
}

// =============================================================================
// Rendering
// =============================================================================

#[test]
fn test_php_round_trip_through_disk() {
    let fixture = TestFixture::with_settings();
    let original = fixture.loader.load_file("settings.php").unwrap();

    fixture
        .loader
        .write_file("rewritten.php", &original)
        .unwrap();
    let reloaded = fixture.loader.load_file("rewritten.php").unwrap();
    assert_eq!(original, reloaded);

    let text = fixture.read_raw("rewritten.php");
    assert!(text.starts_with("<?php\nreturn [\n"));
    assert!(text.contains("'className' => 'TYPO3\\\\CMS\\\\Core"));
    assert!(!fixture.path("rewritten.php.tmp").exists());
}

#[test]
fn test_php_to_json_conversion() {
    let fixture = TestFixture::with_settings();
    let original = fixture.loader.load_file("settings.php").unwrap();

    fixture.loader.write_file("settings.json", &original).unwrap();
    let json = fixture.loader.load_file("settings.json").unwrap();
    assert_eq!(original, json);

    // the empty hashing options come back as a mapping in both formats
    assert!(json.get_mapping("FE.passwordHashing.options").is_ok());
}

#[test]
fn test_rendered_text_reparses() {
    let tree = settings_tree();
    let php = PhpFormat::new().render(&tree).unwrap();
    let json = JsonFormat::compact().render(&tree).unwrap();

    let loader = ConfigLoader::default();
    assert_eq!(loader.load_str(&php).unwrap(), tree);
    assert_eq!(loader.load_str(&json).unwrap(), tree);
}
