//! Rule preset for the CMS system settings file
//!
//! Covers the sections the core reads directly. Extension configuration,
//! logging writers and third-party `EXTCONF` entries are declared as open
//! mappings so strict mode accepts whatever they contain.

use super::rule::ValidationRule;
use super::validator::ConfigSchema;
use crate::tree::ScalarType;

/// Supported database drivers
pub const DB_DRIVERS: [&str; 5] = ["mysqli", "pdo_mysql", "pdo_pgsql", "pdo_sqlite", "pdo_sqlsrv"];

/// Supported image processors
pub const GFX_PROCESSORS: [&str; 2] = ["GraphicsMagick", "ImageMagick"];

/// Colorspaces the image processor may use
pub const GFX_COLORSPACES: [&str; 3] = ["RGB", "CMYK", "GRAY"];

/// Mail transports
pub const MAIL_TRANSPORTS: [&str; 4] = ["sendmail", "smtp", "mbox", "mail"];

/// Schema for the CMS settings file
pub struct CmsSchema;

impl ConfigSchema for CmsSchema {
    fn rules() -> Vec<ValidationRule> {
        rules()
    }
}

/// Every rule of the CMS preset, in documentation order.
pub fn rules() -> Vec<ValidationRule> {
    let mut rules = Vec::new();
    rules.extend(backend_rules());
    rules.extend(database_rules());
    rules.extend(frontend_rules());
    rules.extend(graphics_rules());
    rules.extend(mail_rules());
    rules.extend(system_rules());
    rules.extend(extension_rules());
    rules
}

fn password_hashing(section: &str) -> [ValidationRule; 2] {
    [
        ValidationRule::string(&format!("{section}.passwordHashing.className"))
            .describe("Fully qualified class name of the password hash implementation"),
        ValidationRule::mapping(&format!("{section}.passwordHashing.options"))
            .open()
            .describe("Options passed to the password hash implementation"),
    ]
}

fn backend_rules() -> Vec<ValidationRule> {
    let mut rules = vec![
        ValidationRule::mapping("BE").required().describe("Backend settings"),
        ValidationRule::boolean("BE.debug").describe("Show debug output in the backend"),
        // a password hash once set, `false` on fresh installs
        ValidationRule::scalar("BE.installToolPassword")
            .describe("Hashed install tool password, or false when unset"),
    ];
    rules.extend(password_hashing("BE"));
    rules
}

fn database_rules() -> Vec<ValidationRule> {
    vec![
        ValidationRule::mapping("DB").required().describe("Database settings"),
        ValidationRule::mapping("DB.Connections")
            .required()
            .describe("Named database connections"),
        ValidationRule::one_of("DB.Connections.*.driver", DB_DRIVERS)
            .describe("Database driver"),
        ValidationRule::string("DB.Connections.*.host").describe("Database host name"),
        ValidationRule::integer("DB.Connections.*.port")
            .min(1.0)
            .max(65535.0)
            .describe("Database port"),
        ValidationRule::string("DB.Connections.*.dbname").describe("Database name"),
        ValidationRule::string("DB.Connections.*.user").describe("Database user"),
        ValidationRule::string("DB.Connections.*.password").describe("Database password"),
        ValidationRule::string("DB.Connections.*.charset").describe("Connection character set"),
        ValidationRule::mapping("DB.Connections.*.tableoptions")
            .open()
            .describe("Default table options"),
    ]
}

fn frontend_rules() -> Vec<ValidationRule> {
    let mut rules = vec![
        ValidationRule::mapping("FE").required().describe("Frontend settings"),
        ValidationRule::boolean("FE.debug").describe("Show debug output in the frontend"),
        ValidationRule::boolean("FE.disableNoCacheParameter")
            .describe("Ignore the no_cache request parameter"),
    ];
    rules.extend(password_hashing("FE"));
    rules
}

fn graphics_rules() -> Vec<ValidationRule> {
    vec![
        ValidationRule::mapping("GFX").required().describe("Image processing settings"),
        ValidationRule::one_of("GFX.processor", GFX_PROCESSORS).describe("Image processor"),
        ValidationRule::one_of("GFX.processor_colorspace", GFX_COLORSPACES)
            .describe("Colorspace used by the image processor"),
        ValidationRule::boolean("GFX.processor_enabled").describe("Enable image processing"),
        ValidationRule::boolean("GFX.processor_effects").describe("Enable image effects"),
        ValidationRule::boolean("GFX.processor_allowTemporaryMasksAsPng")
            .describe("Write temporary masks as PNG"),
        ValidationRule::string("GFX.processor_path").describe("Directory of the processor binaries"),
    ]
}

fn mail_rules() -> Vec<ValidationRule> {
    vec![
        ValidationRule::mapping("MAIL").required().describe("Mail settings"),
        ValidationRule::one_of("MAIL.transport", MAIL_TRANSPORTS).describe("Mail transport"),
        ValidationRule::string("MAIL.transport_sendmail_command")
            .describe("Command used by the sendmail transport"),
        ValidationRule::string("MAIL.transport_smtp_server").describe("SMTP server as host:port"),
        ValidationRule::string("MAIL.transport_smtp_encrypt").describe("SMTP encryption"),
        ValidationRule::string("MAIL.transport_smtp_username").describe("SMTP user name"),
        ValidationRule::string("MAIL.transport_smtp_password").describe("SMTP password"),
    ]
}

fn system_rules() -> Vec<ValidationRule> {
    vec![
        ValidationRule::mapping("SYS").required().describe("System settings"),
        ValidationRule::string("SYS.sitename").describe("Name of the installation"),
        ValidationRule::string("SYS.devIPmask")
            .describe("Comma separated IP addresses that see debug output"),
        ValidationRule::string("SYS.encryptionKey")
            .matching("^[0-9a-f]*$")
            .describe("Hex encoded installation secret"),
        ValidationRule::integer("SYS.displayErrors")
            .allowed([-1, 0, 1])
            .describe("Error display mode: -1 uses devIPmask, 0 off, 1 on"),
        ValidationRule::integer("SYS.belogErrorReporting")
            .min(0.0)
            .describe("Error levels written to the backend log"),
        ValidationRule::integer("SYS.exceptionalErrors")
            .min(0.0)
            .describe("Error levels turned into exceptions"),
        ValidationRule::sequence("SYS.systemMaintainers")
            .items(ScalarType::Integer)
            .describe("User ids of system maintainers"),
        ValidationRule::boolean("SYS.features.*").describe("Feature toggles"),
    ]
}

fn extension_rules() -> Vec<ValidationRule> {
    vec![
        ValidationRule::mapping("EXTCONF")
            .open()
            .describe("Configuration registered by extensions at runtime"),
        ValidationRule::sequence("EXTCONF.lang.availableLanguages")
            .items(ScalarType::String)
            .describe("Installed language packs"),
        ValidationRule::mapping("EXTENSIONS.*")
            .open()
            .describe("Per-extension settings"),
        ValidationRule::mapping("LOG").open().describe("Log writer configuration"),
    ]
}
