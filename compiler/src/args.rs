//! Shell-style tokenization of macro arguments and flag binding.

use std::collections::BTreeMap;

use crate::error::CompileError;

/// How a flag consumes input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    /// `--name value` or `--name=value`.
    Value,
    /// `--name`, or `-n` for a single-letter name; true when present.
    Switch,
}

#[derive(Debug, Clone, Copy)]
pub struct FlagSpec {
    pub name: &'static str,
    pub kind: FlagKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Text(String),
    Switch,
}

/// Flags bound for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flags {
    values: BTreeMap<String, FlagValue>,
}

impl Flags {
    /// The value of a value flag, if given.
    pub fn value(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(FlagValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A macro line with its arguments resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub positional: Vec<String>,
    pub flags: Flags,
}

/// Split an argument string the way a POSIX shell would: whitespace
/// separates tokens, quotes keep whitespace, backslash escapes the next
/// character. Inside double quotes a backslash only escapes `"` and `\`.
pub fn tokenize(input: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            '\'' => {
                in_token = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err("unterminated single quote".to_string()),
                    }
                }
            }
            '"' => {
                in_token = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\')) => current.push(c),
                            Some(c) => {
                                current.push('\\');
                                current.push(c);
                            }
                            None => return Err("unterminated double quote".to_string()),
                        },
                        Some(c) => current.push(c),
                        None => return Err("unterminated double quote".to_string()),
                    }
                }
            }
            '\\' => {
                in_token = true;
                match chars.next() {
                    Some(c) => current.push(c),
                    None => return Err("trailing backslash".to_string()),
                }
            }
            c => {
                in_token = true;
                current.push(c);
            }
        }
    }

    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Tokens starting with `-` are flags, except bare `-` and numbers.
fn is_flag(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-') && token.parse::<f64>().is_err()
}

/// Bind tokens to positionals and to the macro's closed flag set.
pub fn bind(
    macro_name: &str,
    tokens: Vec<String>,
    specs: &[FlagSpec],
) -> Result<(Vec<String>, Flags), CompileError> {
    let mut positional = Vec::new();
    let mut flags = Flags::default();
    let mut only_positional = false;
    let mut iter = tokens.into_iter().peekable();

    while let Some(token) = iter.next() {
        if only_positional || !is_flag(&token) {
            positional.push(token);
            continue;
        }
        if token == "--" {
            only_positional = true;
            continue;
        }

        // `--name` spells long names, `-x` a single-letter switch.
        let (body, long) = match token.strip_prefix("--") {
            Some(body) => (body, true),
            None => (&token[1..], false),
        };
        let (name, inline_value) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (body, None),
        };

        let spec = specs
            .iter()
            .find(|spec| {
                spec.name == name
                    && if long {
                        spec.name.len() > 1
                    } else {
                        spec.name.len() == 1 && spec.kind == FlagKind::Switch
                    }
            })
            .ok_or_else(|| CompileError::UnknownFlag {
                macro_name: macro_name.to_string(),
                flag: token.clone(),
            })?;

        let value = match spec.kind {
            FlagKind::Switch => {
                if inline_value.is_some() {
                    return Err(CompileError::invalid_argument(
                        macro_name,
                        format!("flag '{}' takes no value", token),
                    ));
                }
                FlagValue::Switch
            }
            FlagKind::Value => match inline_value.or_else(|| iter.next_if(|next| !is_flag(next))) {
                Some(value) => FlagValue::Text(value),
                None => {
                    return Err(CompileError::invalid_argument(
                        macro_name,
                        format!("flag '--{}' requires a value", spec.name),
                    ));
                }
            },
        };
        flags.values.insert(spec.name.to_string(), value);
    }

    Ok((positional, flags))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const SPECS: &[FlagSpec] = &[
        FlagSpec {
            name: "lib",
            kind: FlagKind::Value,
        },
        FlagSpec {
            name: "r",
            kind: FlagKind::Switch,
        },
    ];

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(tokenize("  a  b\tc ").unwrap(), tokens(&["a", "b", "c"]));
        assert!(tokenize("   ").unwrap().is_empty());
    }

    #[test]
    fn quotes_keep_whitespace() {
        assert_eq!(
            tokenize(r#"'my block' "other  one" mixed"quoted part""#).unwrap(),
            tokens(&["my block", "other  one", "mixedquoted part"])
        );
        assert_eq!(tokenize("''").unwrap(), tokens(&[""]));
    }

    #[test]
    fn backslash_escapes() {
        assert_eq!(tokenize(r"my\ block").unwrap(), tokens(&["my block"]));
        assert_eq!(tokenize(r#""a\"b\\c\d""#).unwrap(), tokens(&[r#"a"b\c\d"#]));
        assert_eq!(tokenize(r"'a\b'").unwrap(), tokens(&[r"a\b"]));
    }

    #[test]
    fn unterminated_input_is_rejected() {
        assert!(tokenize("'open").is_err());
        assert!(tokenize("\"open").is_err());
        assert!(tokenize("trailing\\").is_err());
    }

    #[test]
    fn binds_value_flags_and_positionals() {
        let (positional, flags) =
            bind("include", tokens(&["block", "--lib", "parts.fa"]), SPECS).unwrap();
        assert_eq!(positional, tokens(&["block"]));
        assert_eq!(flags.value("lib"), Some("parts.fa"));

        let (positional, flags) =
            bind("include", tokens(&["--lib=parts.fa", "block"]), SPECS).unwrap();
        assert_eq!(positional, tokens(&["block"]));
        assert_eq!(flags.value("lib"), Some("parts.fa"));
    }

    #[test]
    fn switches_do_not_consume_the_next_token() {
        let (positional, flags) = bind("use_template", tokens(&["-r", "t", "a"]), SPECS).unwrap();
        assert!(flags.is_set("r"));
        assert_eq!(positional, tokens(&["t", "a"]));
    }

    #[test]
    fn numbers_and_double_dash_are_positional() {
        let (positional, flags) = bind("mutate", tokens(&["-5", "--", "--lib"]), SPECS).unwrap();
        assert!(flags.is_empty());
        assert_eq!(positional, tokens(&["-5", "--lib"]));
    }

    #[test]
    fn unknown_flags_are_rejected() {
        let err = bind("include", tokens(&["b", "--table", "2"]), SPECS).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MacroArgument);
        assert!(err.to_string().contains("--table"), "{}", err);
    }

    #[test]
    fn flag_names_are_spelled_exactly() {
        for args in [&["--r", "t"][..], &["-lib", "parts.fa", "b"][..], &["-lib=parts.fa", "b"][..]] {
            let err = bind("use_template", tokens(args), SPECS).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MacroArgument);
            assert!(err.to_string().contains(args[0]), "{}", err);
        }
    }

    #[test]
    fn value_flag_without_value_is_rejected() {
        let err = bind("include", tokens(&["b", "--lib"]), SPECS).unwrap_err();
        assert!(err.to_string().contains("requires a value"), "{}", err);
        assert!(bind("include", tokens(&["--lib", "-r"]), SPECS).is_err());
    }
}
