//! Typed command grammar for the meter.
//!
//! Chat text is lexed here, once, into [`MeterCommand`] variants; the
//! reducer never sees raw strings. Anything that does not parse — unknown
//! verb, missing argument, malformed or non-finite number — yields `None`,
//! which callers treat as a silent no-op. Chat input is untrusted and
//! malformed input must stay invisible.

use crate::engine::state::SubDetectMode;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeterCommand {
    /// `!hm set <value> [<max>]`, also `!sethypemeter` / `!sethm`.
    Set { value: f64, max: Option<f64> },
    /// `!hm add <delta>`
    Add { delta: f64 },
    /// `!hm get`
    Get,
    /// `!hm reload`
    Reload,
    /// `!hm bitsrate <rate>`
    BitsRate { rate: f64 },
    /// `!hm subrate1|subrate2|subrate3 <rate>`
    SubRate { tier: u32, rate: f64 },
    /// `!hm config`
    Config,
    /// `!hm reset`
    Reset,
    /// `!hm simbits <bits>`
    SimBits { bits: f64 },
    /// `!hm simsubs <count> [tier]`
    SimSubs { count: u32, tier: u32 },
    /// `!hm messages enable|disable`
    Messages { enabled: bool },
    /// `!hm subdetect event|message`
    SubDetect { mode: SubDetectMode },
    /// `!hm complete [newMax]`
    Complete { new_max: Option<f64> },
}

/// Parse one trimmed chat line. `None` means "not a command for us" —
/// including every malformed variant of one.
pub fn parse(text: &str) -> Option<MeterCommand> {
    let mut tokens = text.split_whitespace();
    let verb = tokens.next()?;
    let args: Vec<&str> = tokens.collect();

    match verb {
        "!sethypemeter" | "!sethm" => parse_set(&args),
        "!hm" => {
            let (sub, sub_args) = args.split_first()?;
            parse_subcommand(sub, sub_args)
        }
        _ => None,
    }
}

fn parse_subcommand(sub: &str, args: &[&str]) -> Option<MeterCommand> {
    match sub {
        "set" => parse_set(args),
        "add" => Some(MeterCommand::Add {
            delta: parse_number(args.first()?)?,
        }),
        "get" => Some(MeterCommand::Get),
        "reload" => Some(MeterCommand::Reload),
        "bitsrate" => Some(MeterCommand::BitsRate {
            rate: parse_number(args.first()?)?,
        }),
        "subrate1" | "subrate2" | "subrate3" => {
            // Verb suffix is one of "1".."3" by construction.
            let tier: u32 = sub["subrate".len()..].parse().ok()?;
            Some(MeterCommand::SubRate {
                tier,
                rate: parse_number(args.first()?)?,
            })
        }
        "config" => Some(MeterCommand::Config),
        "reset" => Some(MeterCommand::Reset),
        "simbits" => Some(MeterCommand::SimBits {
            bits: parse_number(args.first()?)?,
        }),
        "simsubs" => {
            let count: u32 = args.first()?.parse().ok()?;
            let tier: u32 = match args.get(1) {
                Some(t) => t.parse().ok()?,
                None => 1,
            };
            Some(MeterCommand::SimSubs { count, tier })
        }
        "messages" => match *args.first()? {
            "enable" => Some(MeterCommand::Messages { enabled: true }),
            "disable" => Some(MeterCommand::Messages { enabled: false }),
            _ => None,
        },
        "subdetect" => match *args.first()? {
            "event" => Some(MeterCommand::SubDetect {
                mode: SubDetectMode::Event,
            }),
            "message" => Some(MeterCommand::SubDetect {
                mode: SubDetectMode::Message,
            }),
            _ => None,
        },
        "complete" => {
            let new_max = match args.first() {
                Some(raw) => Some(parse_number(raw)?),
                None => None,
            };
            Some(MeterCommand::Complete { new_max })
        }
        _ => None,
    }
}

fn parse_set(args: &[&str]) -> Option<MeterCommand> {
    let value = parse_number(args.first()?)?;
    let max = match args.get(1) {
        Some(raw) => Some(parse_number(raw)?),
        None => None,
    };
    Some(MeterCommand::Set { value, max })
}

/// Numeric lexing: `f64::parse` accepts "NaN" and "inf", which must never
/// reach state, so finiteness is part of well-formedness here.
fn parse_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}
