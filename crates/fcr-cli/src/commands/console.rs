//! Interactive console commands read from stdin during a session

use std::str::FromStr;

use fcr_core::Adjustment;

pub const HELP: &str = "\
Commands:
  pause | resume          stop or restart dataframe polling
  inc <id> | dec <id>     step an adjustment (idlespeed, idledecay, ignitionadvance, stft, ltft, iac)
  act <id> on|off         switch an actuator test
  interval <ms>           change the poll interval
  status                  show the session state
  quit                    disconnect and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Pause,
    Resume,
    Increase(Adjustment),
    Decrease(Adjustment),
    Actuate { actuator: String, activate: bool },
    Interval(u64),
    Status,
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let command = match words.as_slice() {
            ["pause"] => ConsoleCommand::Pause,
            ["resume"] => ConsoleCommand::Resume,
            ["inc", id] => ConsoleCommand::Increase(id.parse()?),
            ["dec", id] => ConsoleCommand::Decrease(id.parse()?),
            ["act", actuator, state] => {
                let activate = match *state {
                    "on" => true,
                    "off" => false,
                    other => return Err(format!("Expected on or off, got '{}'", other)),
                };
                ConsoleCommand::Actuate {
                    actuator: actuator.to_string(),
                    activate,
                }
            }
            ["interval", ms] => ConsoleCommand::Interval(
                ms.parse()
                    .map_err(|_| format!("Invalid interval '{}'", ms))?,
            ),
            ["status"] => ConsoleCommand::Status,
            ["help"] | ["?"] => ConsoleCommand::Help,
            ["quit"] | ["exit"] | ["q"] => ConsoleCommand::Quit,
            [] => return Err("Empty command".to_string()),
            _ => return Err(format!("Unknown command '{}' (try help)", line.trim())),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!("pause".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Pause));
        assert_eq!(" resume ".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Resume));
        assert_eq!(
            "inc IAC".parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Increase(Adjustment::IacPosition))
        );
        assert_eq!(
            "dec stft".parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Decrease(Adjustment::ShortTermFuelTrim))
        );
        assert_eq!(
            "act fuelpump on".parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Actuate {
                actuator: "fuelpump".into(),
                activate: true
            })
        );
        assert_eq!("interval 500".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Interval(500)));
        assert_eq!("q".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<ConsoleCommand>().is_err());
        assert!("inc choke".parse::<ConsoleCommand>().is_err());
        assert!("act fan1 maybe".parse::<ConsoleCommand>().is_err());
        assert!("interval fast".parse::<ConsoleCommand>().is_err());
        let err = "reboot".parse::<ConsoleCommand>().unwrap_err();
        assert!(err.contains("reboot"));
    }
}
