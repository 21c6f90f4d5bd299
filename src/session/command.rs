use thiserror::Error;

use crate::slip::{Market, Selection, SlipMode, UnknownVariant};

pub const HELP: &str = "\
commands:
  games                                   list games and quotes
  add <game> <market> <side> [period|prop] add a selection (again to remove it)
  remove <bet-id>                         remove a leg
  stake <bet-id> <amount>                 set a stake (parlay: shared stake)
  mode single|parlay                      switch slip mode
  clear                                   empty the slip
  show                                    print the slip
  place                                   place the slip
  bets                                    list placed bets
  help                                    this text
  quit                                    leave the session";

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error(transparent)]
    Variant(#[from] UnknownVariant),

    #[error("invalid amount: {0}")]
    Amount(String),
}

/// One line of input from the terminal surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Games,
    Add {
        game_id: String,
        market: Market,
        selection: Selection,
        sub_period: Option<String>,
        prop_id: Option<String>,
    },
    Remove(String),
    Stake { bet_id: String, amount: f64 },
    Mode(SlipMode),
    Clear,
    Show,
    Place,
    Bets,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines parse to `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let cmd = match head.to_lowercase().as_str() {
            "games" | "g" => Command::Games,
            "add" | "a" => parse_add(&args)?,
            "remove" | "rm" => match args.as_slice() {
                [id] => Command::Remove(id.to_string()),
                _ => return Err(CommandError::Usage("remove <bet-id>")),
            },
            "stake" => match args.as_slice() {
                [id, amount] => Command::Stake {
                    bet_id: id.to_string(),
                    amount: parse_amount(amount)?,
                },
                _ => return Err(CommandError::Usage("stake <bet-id> <amount>")),
            },
            "mode" => match args.as_slice() {
                [mode] => Command::Mode(parse_mode(mode)?),
                _ => return Err(CommandError::Usage("mode single|parlay")),
            },
            "clear" => Command::Clear,
            "show" | "slip" => Command::Show,
            "place" => Command::Place,
            "bets" => Command::Bets,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(cmd))
    }
}

fn parse_add(args: &[&str]) -> Result<Command, CommandError> {
    const USAGE: &str = "add <game> <market> <side> [period|prop-id]";
    let (game_id, market, selection, extra) = match args {
        [game, market, side] => (*game, market.parse::<Market>()?, side.parse::<Selection>()?, None),
        [game, market, side, extra] => (
            *game,
            market.parse::<Market>()?,
            side.parse::<Selection>()?,
            Some(extra.to_string()),
        ),
        _ => return Err(CommandError::Usage(USAGE)),
    };

    let (sub_period, prop_id) = if market.takes_sub_period() {
        (Some(extra.ok_or(CommandError::Usage(USAGE))?), None)
    } else if market.is_player_prop() {
        (None, Some(extra.ok_or(CommandError::Usage(USAGE))?))
    } else {
        (None, None)
    };

    Ok(Command::Add {
        game_id: game_id.to_string(),
        market,
        selection,
        sub_period,
        prop_id,
    })
}

fn parse_amount(raw: &str) -> Result<f64, CommandError> {
    let amount: f64 = raw
        .trim_start_matches('$')
        .parse()
        .map_err(|_| CommandError::Amount(raw.to_string()))?;
    if amount.is_finite() {
        Ok(amount)
    } else {
        Err(CommandError::Amount(raw.to_string()))
    }
}

fn parse_mode(raw: &str) -> Result<SlipMode, CommandError> {
    match raw.to_lowercase().as_str() {
        "single" | "singles" => Ok(SlipMode::Single),
        "parlay" => Ok(SlipMode::Parlay),
        other => Err(UnknownVariant {
            kind: "mode",
            value: other.to_string(),
        }
        .into()),
    }
}
