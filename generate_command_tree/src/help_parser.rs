use anyhow::Result;
use regex::Regex;

use nerdctl_shim::command_tree::GeneratedCommand;

/// Which section of the help text the current line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    Commands,
    Options,
}

/// Parses one help screen into the subcommands and options it lists.
///
/// Section headers are the lines without leading whitespace. Entries are the
/// indented lines under a header ending in the commands or options marker;
/// each entry has a names field and a description separated by two or more
/// spaces. Names are separated by `", "`. An option name followed by a
/// placeholder (`--file value`, `--file string`) takes a value.
#[derive(Debug)]
pub struct HelpParser {
    commands_marker: String,
    options_marker: String,
    field_separator: Regex,
}

impl HelpParser {
    pub fn new(commands_marker: impl Into<String>, options_marker: impl Into<String>) -> Result<Self> {
        Ok(Self {
            commands_marker: commands_marker.into(),
            options_marker: options_marker.into(),
            field_separator: Regex::new(r" {2,}")?,
        })
    }

    pub fn parse(&self, help: &str) -> GeneratedCommand {
        let mut command = GeneratedCommand::default();
        let mut section = Section::Other;

        for line in help.lines() {
            let line = line.trim_end();
            // Blank lines do not end a section.
            if line.is_empty() {
                continue;
            }

            if !line.starts_with(char::is_whitespace) {
                section = if line.ends_with(&self.commands_marker) {
                    Section::Commands
                } else if line.ends_with(&self.options_marker) {
                    Section::Options
                } else {
                    Section::Other
                };
                continue;
            }

            let Some(names) = self.names_field(line) else {
                continue;
            };
            match section {
                Section::Commands => {
                    command
                        .subcommands
                        .extend(names.split(", ").map(str::trim).map(String::from));
                }
                Section::Options => {
                    for name in names.split(", ") {
                        let (option, takes_value) = match name.trim().split_once(' ') {
                            Some((option, _placeholder)) => (option, true),
                            None => (name.trim(), false),
                        };
                        command.options.insert(option.to_string(), takes_value);
                    }
                }
                Section::Other => {}
            }
        }

        command
    }

    /// The names field of an indented entry, or `None` when the line has no
    /// description column.
    fn names_field<'a>(&self, line: &'a str) -> Option<&'a str> {
        let entry = line.trim_start();
        let separator = self.field_separator.find(entry)?;
        let names = entry[..separator.start()].trim();
        (!names.is_empty()).then_some(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT_HELP: &str = "NAME:
   nerdctl - nerdctl is a command line interface for containerd

USAGE:
   nerdctl [global options] command [command options] [arguments...]

COMMANDS:
   run        Run a command in a new container
   container  Manage containers
   help, h    Shows a list of commands or help for one command
   Management commands:
     image    Manage images

GLOBAL OPTIONS:
   --debug                      debug mode (default: false)
   --namespace value, -n value  containerd namespace (default: \"default\")
   --help, -h                   show help (default: false)
";

    fn parser() -> HelpParser {
        HelpParser::new("COMMANDS:", "OPTIONS:").unwrap()
    }

    #[test]
    fn test_parses_subcommands_with_aliases() {
        let command = parser().parse(ROOT_HELP);
        let names: Vec<&str> = command.subcommands.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["container", "h", "help", "image", "run"]);
    }

    #[test]
    fn test_placeholder_marks_value_options() {
        let command = parser().parse(ROOT_HELP);
        assert_eq!(command.options.get("--debug"), Some(&false));
        assert_eq!(command.options.get("--namespace"), Some(&true));
        assert_eq!(command.options.get("-n"), Some(&true));
        assert_eq!(command.options.get("-h"), Some(&false));
        assert_eq!(command.options.len(), 5);
    }

    #[test]
    fn test_other_sections_are_ignored() {
        let help = "USAGE:
   nerdctl run  [options]

DESCRIPTION:
   --not-an-option  described in prose

OPTIONS:
   --rm  remove on exit
";
        let command = parser().parse(help);
        assert!(command.subcommands.is_empty());
        assert_eq!(command.options.len(), 1);
        assert_eq!(command.options.get("--rm"), Some(&false));
    }

    #[test]
    fn test_entries_without_description_column_are_skipped() {
        let help = "COMMANDS:
   lonely
   ok   described
";
        let command = parser().parse(help);
        assert_eq!(command.subcommands.len(), 1);
        assert!(command.subcommands.contains("ok"));
    }

    #[test]
    fn test_blank_lines_keep_the_section() {
        let help = "OPTIONS:
   --all, -a  show all

   --filter value, -f value  filter output
";
        let command = parser().parse(help);
        assert_eq!(command.options.get("-f"), Some(&true));
        assert_eq!(command.options.get("--all"), Some(&false));
    }

    #[test]
    fn test_custom_markers() {
        let help = "Available Commands:
  ls          List containers

Flags:
  -a, --all             Show all
      --format string   Format output
";
        let parser = HelpParser::new("Commands:", "Flags:").unwrap();
        let command = parser.parse(help);
        assert!(command.subcommands.contains("ls"));
        assert_eq!(command.options.get("-a"), Some(&false));
        assert_eq!(command.options.get("--format"), Some(&true));
    }
}
