//! UCI command and `go`-parameter parsing.

#[derive(Debug, Clone)]
pub enum UciCommand {
    Uci,
    IsReady,
    UciNewGame,
    Position(Vec<String>),
    Go(Vec<String>),
    SetOption(Vec<String>),
    Stop,
    PonderHit,
    Quit,
    Display,
    Eval,
    Perft(u32),
    Learn(Vec<String>),
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
    pub ponder: bool,
    pub infinite: bool,
}

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
            "depth" => {
                params.depth = parse_next(parts, i);
                2
            }
            "nodes" => {
                params.nodes = parse_next(parts, i);
                2
            }
            "ponder" => {
                params.ponder = true;
                1
            }
            "infinite" => {
                params.infinite = true;
                1
            }
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
    let owned = || parts.iter().map(|p| (*p).to_string()).collect::<Vec<_>>();

    let cmd = match parts[0] {
        "uci" => UciCommand::Uci,
        "isready" => UciCommand::IsReady,
        "ucinewgame" => UciCommand::UciNewGame,
        "position" => UciCommand::Position(owned()),
        "go" => UciCommand::Go(owned()),
        "setoption" => UciCommand::SetOption(owned()),
        "stop" => UciCommand::Stop,
        "ponderhit" => UciCommand::PonderHit,
        "quit" => UciCommand::Quit,
        "d" => UciCommand::Display,
        "eval" => UciCommand::Eval,
        "perft" => {
            let depth = parts.get(1).and_then(|v| v.parse().ok()).unwrap_or(1);
            UciCommand::Perft(depth)
        }
        "learn" => UciCommand::Learn(owned()),
        _ => UciCommand::Unknown(trimmed.to_string()),
    };
    Some(cmd)
}

/// Pull `name` and `value` out of a `setoption` command. Both may span
/// multiple words ("Move Overhead", file paths with spaces).
#[must_use]
pub fn parse_setoption(parts: &[&str]) -> Option<(String, Option<String>)> {
    let name_idx = parts.iter().position(|p| *p == "name")?;
    let value_idx = parts.iter().position(|p| *p == "value");
    let name = match value_idx {
        Some(v_idx) if v_idx > name_idx + 1 => parts[name_idx + 1..v_idx].join(" "),
        None if name_idx + 1 < parts.len() => parts[name_idx + 1..].join(" "),
        _ => return None,
    };
    let value = value_idx.and_then(|v_idx| {
        if v_idx + 1 < parts.len() {
            Some(parts[v_idx + 1..].join(" "))
        } else {
            None
        }
    });
    Some((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        assert!(matches!(parse_uci_command("uci"), Some(UciCommand::Uci)));
        assert!(matches!(
            parse_uci_command("isready"),
            Some(UciCommand::IsReady)
        ));
        assert!(matches!(
            parse_uci_command("ucinewgame"),
            Some(UciCommand::UciNewGame)
        ));
        assert!(matches!(parse_uci_command("stop"), Some(UciCommand::Stop)));
        assert!(matches!(parse_uci_command("quit"), Some(UciCommand::Quit)));
        assert!(matches!(
            parse_uci_command("ponderhit"),
            Some(UciCommand::PonderHit)
        ));
        assert!(matches!(parse_uci_command("d"), Some(UciCommand::Display)));
        assert!(matches!(parse_uci_command("eval"), Some(UciCommand::Eval)));
        assert!(parse_uci_command("").is_none());
        assert!(parse_uci_command("   ").is_none());
    }

    #[test]
    fn test_position_keeps_tokens() {
        match parse_uci_command("position startpos moves e2e4 e7e5") {
            Some(UciCommand::Position(parts)) => {
                assert_eq!(parts, vec!["position", "startpos", "moves", "e2e4", "e7e5"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_perft_depth() {
        assert!(matches!(
            parse_uci_command("perft 5"),
            Some(UciCommand::Perft(5))
        ));
        assert!(matches!(
            parse_uci_command("perft"),
            Some(UciCommand::Perft(1))
        ));
    }

    #[test]
    fn test_unknown_command() {
        assert!(matches!(
            parse_uci_command("frobnicate"),
            Some(UciCommand::Unknown(_))
        ));
    }

    #[test]
    fn test_go_params_full_clock() {
        let parts = vec![
            "go",
            "wtime",
            "300000",
            "btime",
            "290000",
            "winc",
            "3000",
            "binc",
            "3000",
            "movestogo",
            "40",
        ];
        let params = parse_go_params(&parts);
        assert_eq!(params.wtime, Some(300_000));
        assert_eq!(params.btime, Some(290_000));
        assert_eq!(params.winc, Some(3000));
        assert_eq!(params.binc, Some(3000));
        assert_eq!(params.movestogo, Some(40));
        assert!(!params.infinite);
    }

    #[test]
    fn test_go_params_flags_and_limits() {
        let params = parse_go_params(&["go", "depth", "12", "nodes", "500000"]);
        assert_eq!(params.depth, Some(12));
        assert_eq!(params.nodes, Some(500_000));

        let params = parse_go_params(&["go", "infinite"]);
        assert!(params.infinite);

        let params = parse_go_params(&["go", "ponder", "wtime", "1000", "btime", "1000"]);
        assert!(params.ponder);
    }

    #[test]
    fn test_go_params_bad_values_ignored() {
        let params = parse_go_params(&["go", "depth", "abc", "unknowntoken", "movetime", "250"]);
        assert_eq!(params.depth, None);
        assert_eq!(params.movetime, Some(250));
    }

    #[test]
    fn test_parse_setoption_multiword() {
        let parts = vec!["setoption", "name", "Move", "Overhead", "value", "80"];
        let (name, value) = parse_setoption(&parts).unwrap();
        assert_eq!(name, "Move Overhead");
        assert_eq!(value.as_deref(), Some("80"));

        let parts = vec!["setoption", "name", "Clear", "Hash"];
        let (name, value) = parse_setoption(&parts).unwrap();
        assert_eq!(name, "Clear Hash");
        assert!(value.is_none());

        assert!(parse_setoption(&["setoption"]).is_none());
    }
}
