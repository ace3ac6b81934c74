use std::fmt;

/// One line of learner input. Question and option numbers are 1-based on
/// the wire and stored 0-based here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Sections,
    /// Section id or its 1-based position in the menu.
    Open(String),
    Select {
        question: usize,
        options: Vec<usize>,
    },
    Submit(usize),
    Total,
    Menu,
    History,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Empty,
    Unknown(String),
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },
    InvalidNumber {
        raw: String,
    },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => write!(f, "type a command, or `help`"),
            CommandError::Unknown(word) => write!(f, "unknown command: {word}"),
            CommandError::MissingArgument { command, what } => {
                write!(f, "{command} requires {what}")
            }
            CommandError::InvalidNumber { raw } => {
                write!(f, "expected a number starting at 1, got {raw}")
            }
        }
    }
}

impl std::error::Error for CommandError {}

fn parse_number(raw: &str) -> Result<usize, CommandError> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(CommandError::InvalidNumber {
            raw: raw.to_string(),
        }),
    }
}

fn require<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
    what: &'static str,
) -> Result<&'a str, CommandError> {
    words
        .next()
        .ok_or(CommandError::MissingArgument { command, what })
}

impl Command {
    /// Parses a line such as `select 2 1 3`.
    ///
    /// # Errors
    ///
    /// Returns `CommandError` for blank lines, unknown verbs, missing
    /// arguments, and numbers that are not positive integers.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(CommandError::Empty);
        };

        match verb.to_lowercase().as_str() {
            "sections" | "ls" => Ok(Self::Sections),
            "open" => Ok(Self::Open(
                require(&mut words, "open", "a section id or number")?.to_string(),
            )),
            "select" => {
                let question = parse_number(require(&mut words, "select", "a question number")?)?;
                let options = words.map(parse_number).collect::<Result<Vec<_>, _>>()?;
                Ok(Self::Select { question, options })
            }
            "submit" => Ok(Self::Submit(parse_number(require(
                &mut words,
                "submit",
                "a question number",
            )?)?)),
            "total" => Ok(Self::Total),
            "menu" | "back" => Ok(Self::Menu),
            "history" => Ok(Self::History),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            _ => Err(CommandError::Unknown(verb.to_string())),
        }
    }
}
