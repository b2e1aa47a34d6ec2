use crate::board::{SearchParams, DEFAULT_TT_MB};

/// Print a UCI spin option.
fn print_spin(
    name: &str,
    default: impl std::fmt::Display,
    min: impl std::fmt::Display,
    max: impl std::fmt::Display,
) {
    println!("option name {name} type spin default {default} min {min} max {max}");
}

/// Print a UCI string option.
fn print_string(name: &str, default: &str) {
    println!("option name {name} type string default {default}");
}

/// The three `setoption` names §6 defines. Tuning lives entirely in the
/// `-T` tuning-file path (§6, §9); there is no `setoption name Tune...`.
pub enum UciOptionAction {
    ReinitHash(usize),
    SetThreads(usize),
    SetSyzygyPath(String),
}

pub struct UciOptions {
    pub hash_mb: usize,
    pub threads: usize,
    pub syzygy_path: Option<String>,
}

impl UciOptions {
    #[must_use]
    pub fn new(hash_mb: usize) -> Self {
        UciOptions {
            hash_mb,
            threads: 1,
            syzygy_path: None,
        }
    }

    pub fn print(&self, _params: &SearchParams) {
        println!("id name chess_engine");
        println!("id author Dean Menezes");

        print_spin("Hash", self.hash_mb, 1, 65536);
        print_spin("Threads", self.threads, 1, 256);
        print_string("SyzygyPath", self.syzygy_path.as_deref().unwrap_or(""));

        println!("uciok");
    }

    pub fn apply_setoption(&mut self, name: &str, value: Option<&str>) -> Option<UciOptionAction> {
        let normalized = name.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "hash" => {
                let mb = value
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(DEFAULT_TT_MB)
                    .max(1);
                if mb != self.hash_mb {
                    self.hash_mb = mb;
                    return Some(UciOptionAction::ReinitHash(mb));
                }
            }
            "threads" => {
                let threads = value
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(1)
                    .clamp(1, 256);
                if threads != self.threads {
                    self.threads = threads;
                    return Some(UciOptionAction::SetThreads(threads));
                }
            }
            "syzygypath" => {
                let path = value.unwrap_or("").to_string();
                self.syzygy_path = if path.is_empty() { None } else { Some(path.clone()) };
                return Some(UciOptionAction::SetSyzygyPath(path));
            }
            _ => {}
        }
        None
    }
}

#[must_use]
pub fn parse_setoption(parts: &[&str]) -> Option<(String, Option<String>)> {
    if parts.is_empty() || parts[0] != "setoption" {
        return None;
    }

    let mut name_parts: Vec<&str> = Vec::new();
    let mut value_parts: Vec<&str> = Vec::new();
    let mut mode = "";

    for part in parts.iter().skip(1) {
        match *part {
            "name" => mode = "name",
            "value" => mode = "value",
            _ => match mode {
                "name" => name_parts.push(part),
                "value" => value_parts.push(part),
                _ => {}
            },
        }
    }

    if name_parts.is_empty() {
        return None;
    }

    let name = name_parts.join(" ");
    let value = if value_parts.is_empty() {
        None
    } else {
        Some(value_parts.join(" "))
    };

    Some((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_setoption_name_and_value() {
        let parts: Vec<&str> = "setoption name Hash value 256".split_whitespace().collect();
        let (name, value) = parse_setoption(&parts).unwrap();
        assert_eq!(name, "Hash");
        assert_eq!(value.as_deref(), Some("256"));
    }

    #[test]
    fn parses_multi_word_names() {
        let parts: Vec<&str> = "setoption name SyzygyPath value /tmp/tb".split_whitespace().collect();
        let (name, value) = parse_setoption(&parts).unwrap();
        assert_eq!(name, "SyzygyPath");
        assert_eq!(value.as_deref(), Some("/tmp/tb"));
    }

    #[test]
    fn applies_hash_resize() {
        let mut opts = UciOptions::new(64);
        let action = opts.apply_setoption("Hash", Some("128"));
        assert!(matches!(action, Some(UciOptionAction::ReinitHash(128))));
        assert_eq!(opts.hash_mb, 128);
    }

    #[test]
    fn applies_thread_count() {
        let mut opts = UciOptions::new(64);
        let action = opts.apply_setoption("Threads", Some("4"));
        assert!(matches!(action, Some(UciOptionAction::SetThreads(4))));
        assert_eq!(opts.threads, 4);
    }

    #[test]
    fn applies_syzygy_path() {
        let mut opts = UciOptions::new(64);
        opts.apply_setoption("SyzygyPath", Some("/tmp/tb"));
        assert_eq!(opts.syzygy_path.as_deref(), Some("/tmp/tb"));
    }

    #[test]
    fn unknown_option_is_ignored() {
        let mut opts = UciOptions::new(64);
        let action = opts.apply_setoption("MultiPV", Some("4"));
        assert!(action.is_none());
    }
}
