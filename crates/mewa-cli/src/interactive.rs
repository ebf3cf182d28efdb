//! Line commands for the interactive mode

/// A command typed at the interactive prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractiveCommand {
    SendEvent { id: String, params: String, ack: bool },
    SendMessage { to_device: String, id: String, params: String },
    Devices,
    LastEvents { device: String, prefix: String },
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  event <id> [params]              broadcast an event
  ack-event <id> [params]          broadcast an event and ask for an ack
  message <device> <id> [params]   send a message to one device
  devices                          list joined devices
  last [device] [prefix]           show recent events (\"-\" for any device)
  help                             show this help
  quit                             disconnect and exit";

/// Parse one input line. Empty lines give `Ok(None)`.
///
/// Parameters are everything after the id, taken verbatim so JSON can contain spaces.
pub fn parse_line(line: &str) -> Result<Option<InteractiveCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = split_word(line);
    let command = match verb {
        "event" | "ack-event" => {
            let (id, params) = split_word(rest);
            if id.is_empty() {
                return Err(format!("usage: {} <id> [params]", verb));
            }
            InteractiveCommand::SendEvent {
                id: id.to_string(),
                params: params.to_string(),
                ack: verb == "ack-event",
            }
        }
        "message" | "msg" => {
            let (to_device, rest) = split_word(rest);
            let (id, params) = split_word(rest);
            if to_device.is_empty() || id.is_empty() {
                return Err("usage: message <device> <id> [params]".to_string());
            }
            InteractiveCommand::SendMessage {
                to_device: to_device.to_string(),
                id: id.to_string(),
                params: params.to_string(),
            }
        }
        "devices" => InteractiveCommand::Devices,
        "last" => {
            let (device, rest) = split_word(rest);
            let (prefix, _) = split_word(rest);
            let device = if device == "-" { "" } else { device };
            InteractiveCommand::LastEvents {
                device: device.to_string(),
                prefix: prefix.to_string(),
            }
        }
        "help" | "?" => InteractiveCommand::Help,
        "quit" | "exit" => InteractiveCommand::Quit,
        other => return Err(format!("unknown command '{}', try 'help'", other)),
    };

    Ok(Some(command))
}

fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.find(char::is_whitespace) {
        Some(at) => (&input[..at], input[at..].trim_start()),
        None => (input, ""),
    }
}
