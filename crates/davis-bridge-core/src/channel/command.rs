//! Server commands
//!
//! Commands arrive as short ASCII strings and are matched without regard
//! to case. Anything unrecognised is kept verbatim so it can be logged.

/// Reply to `help` and `?`
pub const HELP_TEXT: &str =
    "Available commands are exit; truncate; debug 0|1; interval; hilow; graph; loop";

/// A decoded command frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCommand {
    /// Stop the bridge
    Exit,
    /// Acknowledgement, nothing to do
    Ok,
    /// Empty the local log file
    Truncate,
    /// Switch verbose tracing on or off
    Debug(bool),
    /// List the commands
    Help,
    /// Dump the highs and lows block
    HiLow,
    /// Dump the EEPROM image
    Graph,
    /// Dump one real-time packet
    Loop,
    /// Set the poll interval in seconds (0 selects the default)
    Interval(u64),
    /// Anything else
    Unknown(String),
}

impl ServerCommand {
    /// Decode a frame payload. Text after a NUL byte is ignored.
    pub fn parse(payload: &[u8]) -> Self {
        let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
        let text = String::from_utf8_lossy(&payload[..end]);
        let text = text.as_ref();

        let is = |word: &str| text.eq_ignore_ascii_case(word);

        if is("exit") {
            ServerCommand::Exit
        } else if is("ok") {
            ServerCommand::Ok
        } else if is("truncate") {
            ServerCommand::Truncate
        } else if is("debug 0") {
            ServerCommand::Debug(false)
        } else if is("debug 1") {
            ServerCommand::Debug(true)
        } else if is("help") || text.starts_with('?') {
            ServerCommand::Help
        } else if is("hilow") {
            ServerCommand::HiLow
        } else if is("graph") {
            ServerCommand::Graph
        } else if is("loop") {
            ServerCommand::Loop
        } else if let Some(arg) = strip_prefix_ignore_case(text, "interval ") {
            ServerCommand::Interval(u64::try_from(parse_c_integer(arg)).unwrap_or(0))
        } else {
            ServerCommand::Unknown(text.to_string())
        }
    }

    /// Whether the bridge keeps running after this command
    pub fn keeps_running(&self) -> bool {
        !matches!(self, ServerCommand::Exit)
    }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

/// Parse a leading integer the way C's `strtol(s, NULL, 0)` does: optional
/// whitespace and sign, then `0x` hex, `0` octal or decimal digits. Stops
/// at the first invalid character; no digits gives 0.
pub fn parse_c_integer(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"));
    let (radix, digits) = if let Some(hex) = hex {
        (16, hex)
    } else if s.starts_with('0') {
        (8, s)
    } else {
        (10, s)
    };

    let mut value: i64 = 0;
    for c in digits.chars() {
        match c.to_digit(radix) {
            Some(d) => {
                value = value
                    .saturating_mul(i64::from(radix))
                    .saturating_add(i64::from(d))
            }
            None => break,
        }
    }

    if negative {
        -value
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fixed_commands() {
        assert_eq!(ServerCommand::parse(b"exit"), ServerCommand::Exit);
        assert_eq!(ServerCommand::parse(b"EXIT"), ServerCommand::Exit);
        assert_eq!(ServerCommand::parse(b"Ok"), ServerCommand::Ok);
        assert_eq!(ServerCommand::parse(b"truncate"), ServerCommand::Truncate);
        assert_eq!(ServerCommand::parse(b"debug 0"), ServerCommand::Debug(false));
        assert_eq!(ServerCommand::parse(b"Debug 1"), ServerCommand::Debug(true));
        assert_eq!(ServerCommand::parse(b"help"), ServerCommand::Help);
        assert_eq!(ServerCommand::parse(b"?"), ServerCommand::Help);
        assert_eq!(ServerCommand::parse(b"?anything"), ServerCommand::Help);
        assert_eq!(ServerCommand::parse(b"HiLow"), ServerCommand::HiLow);
        assert_eq!(ServerCommand::parse(b"graph"), ServerCommand::Graph);
        assert_eq!(ServerCommand::parse(b"LOOP"), ServerCommand::Loop);
    }

    #[test]
    fn test_exact_match_only() {
        assert_eq!(
            ServerCommand::parse(b"exit now"),
            ServerCommand::Unknown("exit now".to_string())
        );
        assert_eq!(
            ServerCommand::parse(b"debug 2"),
            ServerCommand::Unknown("debug 2".to_string())
        );
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(ServerCommand::parse(b"interval 45"), ServerCommand::Interval(45));
        assert_eq!(ServerCommand::parse(b"INTERVAL 0x3c"), ServerCommand::Interval(60));
        assert_eq!(ServerCommand::parse(b"interval 0"), ServerCommand::Interval(0));
        assert_eq!(ServerCommand::parse(b"interval soon"), ServerCommand::Interval(0));
        assert_eq!(ServerCommand::parse(b"interval -5"), ServerCommand::Interval(0));
        assert_eq!(
            ServerCommand::parse(b"interval"),
            ServerCommand::Unknown("interval".to_string())
        );
    }

    #[test]
    fn test_nul_terminated_payload() {
        assert_eq!(ServerCommand::parse(b"exit\0garbage"), ServerCommand::Exit);
    }

    #[test]
    fn test_unknown_kept_verbatim() {
        let cmd = ServerCommand::parse(b"frobnicate");
        assert_eq!(cmd, ServerCommand::Unknown("frobnicate".to_string()));
        assert!(cmd.keeps_running());
        assert!(!ServerCommand::Exit.keeps_running());
    }

    #[test]
    fn test_parse_c_integer() {
        assert_eq!(parse_c_integer("45"), 45);
        assert_eq!(parse_c_integer("  300s"), 300);
        assert_eq!(parse_c_integer("0x1F"), 31);
        assert_eq!(parse_c_integer("010"), 8);
        assert_eq!(parse_c_integer("-7"), -7);
        assert_eq!(parse_c_integer(""), 0);
        assert_eq!(parse_c_integer("abc"), 0);
    }
}
