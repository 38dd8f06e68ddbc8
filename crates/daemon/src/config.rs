//! rsyncd.conf-style module configuration, read once at startup.

use std::path::PathBuf;

use crate::error::ConfigError;

/// One `[name]` section of a configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleConfig {
    /// The module's logical name (the bracketed section header).
    pub name: String,
    /// The filesystem directory this module serves.
    pub path: PathBuf,
    /// Optional free-text description surfaced to clients.
    pub comment: Option<String>,
}

/// Parses an rsyncd.conf-style text file into its module sections.
///
/// Recognised syntax: blank lines and lines starting with `#` are ignored;
/// `[name]` opens a new section; `key = value` sets a field within the
/// current section. No hot-reload: this is meant to be called once, at
/// startup.
///
/// # Errors
///
/// Returns [`ConfigError`] on a malformed line, a setting outside any
/// section, a duplicate module name, or a module missing its required
/// `path` setting.
pub fn parse_config(text: &str) -> Result<Vec<ModuleConfig>, ConfigError> {
    let mut modules = Vec::new();
    let mut current_name: Option<String> = None;
    let mut current_path: Option<PathBuf> = None;
    let mut current_comment: Option<String> = None;

    let flush = |modules: &mut Vec<ModuleConfig>,
                 name: Option<String>,
                 path: Option<PathBuf>,
                 comment: Option<String>|
     -> Result<(), ConfigError> {
        let Some(name) = name else {
            return Ok(());
        };
        let path = path.ok_or_else(|| ConfigError::MissingPath { name: name.clone() })?;
        if modules.iter().any(|m: &ModuleConfig| m.name == name) {
            return Err(ConfigError::DuplicateModule { name });
        }
        modules.push(ModuleConfig {
            name,
            path,
            comment,
        });
        Ok(())
    };

    for (index, raw_line) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(stripped) = line.strip_prefix('[') {
            let Some(name) = stripped.strip_suffix(']') else {
                return Err(ConfigError::Malformed {
                    line: line_number,
                    text: raw_line.to_string(),
                });
            };
            flush(
                &mut modules,
                current_name.take(),
                current_path.take(),
                current_comment.take(),
            )?;
            current_name = Some(name.trim().to_string());
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::Malformed {
                line: line_number,
                text: raw_line.to_string(),
            });
        };
        let key = key.trim();
        let value = value.trim();

        if current_name.is_none() {
            return Err(ConfigError::SettingOutsideSection { line: line_number });
        }

        match key {
            "path" => current_path = Some(PathBuf::from(value)),
            "comment" => current_comment = Some(value.to_string()),
            _ => {
                return Err(ConfigError::Malformed {
                    line: line_number,
                    text: raw_line.to_string(),
                })
            }
        }
    }

    flush(&mut modules, current_name, current_path, current_comment)?;
    Ok(modules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_module_with_comment() {
        let text = "\
[archive]
path = /srv/archive
comment = the archive module
";
        let modules = parse_config(text).unwrap();
        assert_eq!(
            modules,
            vec![ModuleConfig {
                name: "archive".to_string(),
                path: PathBuf::from("/srv/archive"),
                comment: Some("the archive module".to_string()),
            }]
        );
    }

    #[test]
    fn parses_multiple_modules_and_ignores_comments_and_blanks() {
        let text = "\
# top-level comment

[a]
path = /a

[b]
path = /b
comment = module b
";
        let modules = parse_config(text).unwrap();
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].name, "a");
        assert_eq!(modules[1].name, "b");
        assert_eq!(modules[1].comment.as_deref(), Some("module b"));
    }

    #[test]
    fn rejects_setting_outside_any_section() {
        let err = parse_config("path = /a\n").unwrap_err();
        assert_eq!(err, ConfigError::SettingOutsideSection { line: 1 });
    }

    #[test]
    fn rejects_module_missing_path() {
        let err = parse_config("[a]\ncomment = no path here\n").unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingPath {
                name: "a".to_string()
            }
        );
    }

    #[test]
    fn rejects_duplicate_module_names() {
        let text = "[a]\npath = /a\n[a]\npath = /a2\n";
        let err = parse_config(text).unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateModule {
                name: "a".to_string()
            }
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        let err = parse_config("[a]\nnot a setting\n").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { line: 2, .. }));
    }
}
