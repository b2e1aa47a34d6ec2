#[derive(Debug, Clone)]
pub enum UciCommand {
    Uci,
    IsReady,
    UciNewGame,
    Position(Vec<String>),
    Go(Vec<String>),
    Perft(usize),
    SetOption(Vec<String>),
    Debug(Option<String>),
    Stop,
    Quit,
    /// `play <ms>` diagnostic extension: search the current position for a
    /// fixed wall-clock budget and print the chosen move.
    Play(u64),
    /// `sdiv <depth>` diagnostic extension: per-root-move node/score
    /// breakdown ("search divide"), mirroring `perft`'s `divide` idiom.
    SDiv(u32),
    /// `eval` diagnostic extension: print the static evaluation of the
    /// current position from the side to move's perspective.
    Eval,
    /// `fen` diagnostic extension: print the current position's FEN.
    Fen,
    /// `syzygy` diagnostic extension: report whether a tablebase path is
    /// configured and probe the current position if so.
    Syzygy,
    Unknown(String),
}

#[derive(Default, Debug, Clone)]
pub struct GoParams {
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub movetime: Option<u64>,
    pub movestogo: Option<u64>,
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    pub mate: Option<u32>,
    pub infinite: bool,
}

/// Parse the next parameter value as type T.
#[inline]
fn parse_next<T: std::str::FromStr>(parts: &[&str], i: usize) -> Option<T> {
    parts.get(i + 1).and_then(|v| v.parse::<T>().ok())
}

#[must_use]
pub fn parse_go_params(parts: &[&str]) -> GoParams {
    let mut params = GoParams::default();
    let mut i = 1;

    while i < parts.len() {
        let consumed = match parts[i] {
            // Time parameters (u64)
            "wtime" => {
                params.wtime = parse_next(parts, i);
                2
            }
            "btime" => {
                params.btime = parse_next(parts, i);
                2
            }
            "winc" => {
                params.winc = parse_next(parts, i);
                2
            }
            "binc" => {
                params.binc = parse_next(parts, i);
                2
            }
            "movetime" => {
                params.movetime = parse_next(parts, i);
                2
            }
            "movestogo" => {
                params.movestogo = parse_next(parts, i);
                2
            }
            "nodes" => {
                params.nodes = parse_next(parts, i);
                2
            }
            // Depth parameters (u32)
            "depth" => {
                params.depth = parse_next(parts, i);
                2
            }
            "mate" => {
                params.mate = parse_next(parts, i);
                2
            }
            // Flags
            "infinite" => {
                params.infinite = true;
                1
            }
            // Unknown - skip
            _ => 1,
        };
        i += consumed;
    }
    params
}

#[must_use]
pub fn parse_uci_command(line: &str) -> Option<UciCommand> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parts: Vec<&str> = trimmed.split_whitespace().collect();
    if parts.is_empty() {
        return None;
    }

    let owned_parts = || {
        parts
            .iter()
            .map(|p| (*p).to_string())
            .collect::<Vec<String>>()
    };

    let cmd = match parts[0] {
        "uci" => UciCommand::Uci,
        "isready" => UciCommand::IsReady,
        "ucinewgame" => UciCommand::UciNewGame,
        "position" => UciCommand::Position(owned_parts()),
        "go" => UciCommand::Go(owned_parts()),
        "perft" => {
            let depth = parts
                .get(1)
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(1);
            UciCommand::Perft(depth)
        }
        "setoption" => UciCommand::SetOption(owned_parts()),
        "debug" => UciCommand::Debug(parts.get(1).map(|v| (*v).to_string())),
        "stop" => UciCommand::Stop,
        "quit" => UciCommand::Quit,
        "play" => UciCommand::Play(parts.get(1).and_then(|v| v.parse::<u64>().ok()).unwrap_or(1000)),
        "sdiv" => UciCommand::SDiv(parts.get(1).and_then(|v| v.parse::<u32>().ok()).unwrap_or(1)),
        "eval" => UciCommand::Eval,
        "fen" => UciCommand::Fen,
        "syzygy" => UciCommand::Syzygy,
        _ => UciCommand::Unknown(trimmed.to_string()),
    };

    Some(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_diagnostic_extensions() {
        assert!(matches!(parse_uci_command("eval"), Some(UciCommand::Eval)));
        assert!(matches!(parse_uci_command("fen"), Some(UciCommand::Fen)));
        assert!(matches!(parse_uci_command("syzygy"), Some(UciCommand::Syzygy)));
        assert!(matches!(parse_uci_command("play 250"), Some(UciCommand::Play(250))));
        assert!(matches!(parse_uci_command("sdiv 6"), Some(UciCommand::SDiv(6))));
    }

    #[test]
    fn go_params_parses_flags_and_values() {
        let parts: Vec<&str> = "go wtime 1000 btime 2000 winc 10 binc 20 movestogo 30 infinite"
            .split_whitespace()
            .collect();
        let params = parse_go_params(&parts);
        assert_eq!(params.wtime, Some(1000));
        assert_eq!(params.btime, Some(2000));
        assert_eq!(params.winc, Some(10));
        assert_eq!(params.binc, Some(20));
        assert_eq!(params.movestogo, Some(30));
        assert!(params.infinite);
    }
}
