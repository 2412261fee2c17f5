//! Line command shell for the `cuebox` binary
//!
//! One command per line, whitespace separated:
//!
//! ```text
//! go <cue>                 toggle (retrigger) a cue
//! go <cue> <behavior>      toggle with a retrigger override (e.g. restart)
//! play <cue>               start or restart
//! resume <cue>             resume a paused cue
//! stop <cue> [fade]        stop, optionally with the cue's fade-out
//! pause <cue>
//! stopall [fade] [except <cue>]
//! seek <cue> <seconds>
//! next <cue> | prev <cue>  playlist navigation
//! crossfade on|off
//! state <cue>              print a playback snapshot
//! status                   print the currently-playing view
//! quit
//! ```

use cuebox_common::{CueId, RetriggerBehavior};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::playback::{StopAllOptions, StopOptions};
use crate::service::EngineHandle;

/// Parsed shell command
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Go {
        cue_id: CueId,
        retrigger_override: Option<RetriggerBehavior>,
    },
    Play(CueId),
    Resume(CueId),
    Stop { cue_id: CueId, use_fade: bool },
    Pause(CueId),
    StopAll(StopAllOptions),
    Seek { cue_id: CueId, position_secs: f64 },
    Next(CueId),
    Previous(CueId),
    Crossfade(bool),
    State(CueId),
    Status,
    Quit,
}

fn cue_arg(words: &[&str], command: &str) -> Result<CueId> {
    words
        .get(1)
        .map(|w| CueId::from(*w))
        .ok_or_else(|| Error::BadRequest(format!("{} needs a cue id", command)))
}

fn fade_flag(word: Option<&&str>) -> Result<bool> {
    match word {
        None => Ok(false),
        Some(&"fade") => Ok(true),
        Some(other) => Err(Error::BadRequest(format!("unexpected argument '{}'", other))),
    }
}

impl FromStr for ShellCommand {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some(command) = words.first() else {
            return Err(Error::BadRequest("empty command".to_string()));
        };

        match *command {
            "go" => Ok(ShellCommand::Go {
                cue_id: cue_arg(&words, "go")?,
                retrigger_override: words
                    .get(2)
                    .map(|w| w.parse::<RetriggerBehavior>())
                    .transpose()?,
            }),
            "play" => Ok(ShellCommand::Play(cue_arg(&words, "play")?)),
            "resume" => Ok(ShellCommand::Resume(cue_arg(&words, "resume")?)),
            "stop" => Ok(ShellCommand::Stop {
                cue_id: cue_arg(&words, "stop")?,
                use_fade: fade_flag(words.get(2))?,
            }),
            "pause" => Ok(ShellCommand::Pause(cue_arg(&words, "pause")?)),
            "stopall" => {
                let mut options = StopAllOptions::default();
                let mut rest = words[1..].iter();
                while let Some(word) = rest.next() {
                    match *word {
                        "fade" => options.use_fade = true,
                        "except" => {
                            let cue = rest.next().ok_or_else(|| {
                                Error::BadRequest("except needs a cue id".to_string())
                            })?;
                            options.except_cue_id = Some(CueId::from(*cue));
                        }
                        other => {
                            return Err(Error::BadRequest(format!(
                                "unexpected argument '{}'",
                                other
                            )))
                        }
                    }
                }
                Ok(ShellCommand::StopAll(options))
            }
            "seek" => {
                let cue_id = cue_arg(&words, "seek")?;
                let position_secs = words
                    .get(2)
                    .and_then(|w| w.parse::<f64>().ok())
                    .filter(|p| p.is_finite())
                    .ok_or_else(|| Error::BadRequest("seek needs a position in seconds".to_string()))?;
                Ok(ShellCommand::Seek {
                    cue_id,
                    position_secs,
                })
            }
            "next" => Ok(ShellCommand::Next(cue_arg(&words, "next")?)),
            "prev" | "previous" => Ok(ShellCommand::Previous(cue_arg(&words, "prev")?)),
            "crossfade" => match words.get(1) {
                Some(&"on") => Ok(ShellCommand::Crossfade(true)),
                Some(&"off") => Ok(ShellCommand::Crossfade(false)),
                _ => Err(Error::BadRequest("crossfade on|off".to_string())),
            },
            "state" => Ok(ShellCommand::State(cue_arg(&words, "state")?)),
            "status" => Ok(ShellCommand::Status),
            "quit" | "exit" => Ok(ShellCommand::Quit),
            other => Err(Error::BadRequest(format!("unknown command '{}'", other))),
        }
    }
}

impl ShellCommand {
    /// Run against the engine; returns text to print, if any
    pub async fn execute(self, engine: &EngineHandle) -> Result<Option<String>> {
        match self {
            ShellCommand::Go {
                cue_id,
                retrigger_override,
            } => engine.toggle(cue_id, false, retrigger_override).await?,
            ShellCommand::Play(cue_id) => {
                engine.play(placeholder_cue(cue_id), false).await?;
            }
            ShellCommand::Resume(cue_id) => {
                engine.play(placeholder_cue(cue_id), true).await?;
            }
            ShellCommand::Stop { cue_id, use_fade } => {
                let options = if use_fade {
                    StopOptions::with_fade()
                } else {
                    StopOptions::immediate()
                };
                engine.stop(cue_id, options).await?;
            }
            ShellCommand::Pause(cue_id) => {
                if !engine.pause(cue_id).await? {
                    return Ok(Some("not playing".to_string()));
                }
            }
            ShellCommand::StopAll(options) => engine.stop_all(options).await?,
            ShellCommand::Seek {
                cue_id,
                position_secs,
            } => {
                if !engine.seek(cue_id, position_secs).await? {
                    return Ok(Some("nothing to seek".to_string()));
                }
            }
            ShellCommand::Next(cue_id) => {
                if !engine.navigate_next(cue_id).await? {
                    return Ok(Some("navigation refused".to_string()));
                }
            }
            ShellCommand::Previous(cue_id) => {
                if !engine.navigate_previous(cue_id).await? {
                    return Ok(Some("navigation refused".to_string()));
                }
            }
            ShellCommand::Crossfade(enabled) => engine.set_crossfade_mode(enabled).await?,
            ShellCommand::State(cue_id) => {
                let snapshot = engine.get_playback_state(cue_id).await?;
                return Ok(Some(to_json(&snapshot)?));
            }
            ShellCommand::Status => {
                let view = engine.get_currently_playing().await?;
                return Ok(Some(to_json(&view)?));
            }
            ShellCommand::Quit => engine.shutdown().await?,
        }
        Ok(None)
    }
}

/// Cue carrying only an id; the engine refreshes the definition from its store
fn placeholder_cue(cue_id: CueId) -> cuebox_common::Cue {
    cuebox_common::Cue::single(cue_id, String::new())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| Error::BadRequest(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> ShellCommand {
        line.parse().unwrap()
    }

    #[test]
    fn test_parse_go_with_override() {
        assert_eq!(
            parse("go intro restart"),
            ShellCommand::Go {
                cue_id: CueId::from("intro"),
                retrigger_override: Some(RetriggerBehavior::Restart),
            }
        );
        assert_eq!(
            parse("go intro"),
            ShellCommand::Go {
                cue_id: CueId::from("intro"),
                retrigger_override: None,
            }
        );
    }

    #[test]
    fn test_parse_stop_all_options() {
        assert_eq!(
            parse("stopall fade except bed"),
            ShellCommand::StopAll(StopAllOptions {
                except_cue_id: Some(CueId::from("bed")),
                use_fade: true,
            })
        );
        assert_eq!(parse("stopall"), ShellCommand::StopAll(StopAllOptions::default()));
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<ShellCommand>().is_err());
        assert!("stop".parse::<ShellCommand>().is_err());
        assert!("seek a soon".parse::<ShellCommand>().is_err());
        assert!("go a sometimes".parse::<ShellCommand>().is_err());
        assert!("crossfade maybe".parse::<ShellCommand>().is_err());
        assert!("dance".parse::<ShellCommand>().is_err());
    }

    #[test]
    fn test_parse_stop_fade_and_seek() {
        assert_eq!(
            parse("stop a fade"),
            ShellCommand::Stop {
                cue_id: CueId::from("a"),
                use_fade: true
            }
        );
        assert_eq!(
            parse("seek a 12.5"),
            ShellCommand::Seek {
                cue_id: CueId::from("a"),
                position_secs: 12.5
            }
        );
    }
}
