//! Interactive terminal surface over the slip, catalog and placement workflow.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::catalog::{CatalogGame, GameCatalog};
use crate::monitoring::dashboard::spawn_dashboard_task;
use crate::placement::{BetPlacer, PlacedBet, PlacementStage};
use crate::slip::{Slip, SlipMode};
use crate::storage::PlacedBetsStore;
use crate::sync::SyncBridge;
use crate::utils::math::{format_american, format_line};

pub mod command;

pub use command::{Command, CommandError, HELP};

const DASHBOARD_PERIOD: Duration = Duration::from_secs(60);

pub struct Session {
    catalog: GameCatalog,
    bridge: SyncBridge,
    placer: BetPlacer,
    bets: Arc<dyn PlacedBetsStore>,
}

impl Session {
    pub fn new(
        catalog: GameCatalog,
        bridge: SyncBridge,
        placer: BetPlacer,
        bets: Arc<dyn PlacedBetsStore>,
    ) -> Self {
        Self {
            catalog,
            bridge,
            placer,
            bets,
        }
    }

    /// Read commands from stdin until `quit` or end of input, then drain pending mirror writes.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let dashboard = spawn_dashboard_task(DASHBOARD_PERIOD);
        let stage_printer = spawn_stage_printer(self.placer.subscribe());

        if self.bridge.hydrate().await {
            println!("restored your saved slip");
        }
        println!("{}", render_slip(self.bridge.slip()));
        println!("type `help` for commands");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let cmd = match Command::parse(&line) {
                Ok(Some(cmd)) => cmd,
                Ok(None) => continue,
                Err(err) => {
                    println!("{err}");
                    continue;
                }
            };

            match cmd {
                Command::Quit => {
                    if self.placer.is_placing() {
                        println!("a placement is in progress; please wait");
                        continue;
                    }
                    break;
                }
                Command::Place => {
                    let placement = self.placer.place(&mut self.bridge);
                    tokio::pin!(placement);
                    let mut stdin_open = true;
                    let outcome = loop {
                        tokio::select! {
                            res = &mut placement => break res,
                            next = lines.next_line(), if stdin_open => match next {
                                Ok(Some(l)) if !l.trim().is_empty() => {
                                    println!("a placement is in progress; please wait");
                                }
                                Ok(Some(_)) => {}
                                Ok(None) | Err(_) => stdin_open = false,
                            },
                        }
                    };
                    match outcome {
                        Ok(receipt) => {
                            println!("placed {} bet(s)", receipt.records.len());
                            for record in &receipt.records {
                                println!("  {}", render_placed(record));
                            }
                        }
                        Err(err) => println!("{err}"),
                    }
                    if !stdin_open {
                        break;
                    }
                }
                other => {
                    let out = self.apply(other).await;
                    println!("{out}");
                }
            }
        }

        dashboard.abort();
        stage_printer.abort();
        info!(target: "session", user = %self.bridge.user_id(), "session ended");
        self.bridge.shutdown().await;
        Ok(())
    }

    /// Execute a non-placement command and return what to print.
    pub async fn apply(&mut self, cmd: Command) -> String {
        match cmd {
            Command::Games => render_games(self.catalog.games()),
            Command::Add {
                game_id,
                market,
                selection,
                sub_period,
                prop_id,
            } => {
                match self.catalog.request(
                    &game_id,
                    market,
                    selection,
                    sub_period.as_deref(),
                    prop_id.as_deref(),
                ) {
                    Ok(req) => render_slip(self.bridge.add_bet(req)),
                    Err(err) => err.to_string(),
                }
            }
            Command::Remove(id) => {
                if !self.bridge.slip().contains(&id) {
                    return format!("no bet {id} on the slip");
                }
                render_slip(self.bridge.remove_bet(&id))
            }
            Command::Stake { bet_id, amount } => {
                if !self.bridge.slip().contains(&bet_id) {
                    return format!("no bet {bet_id} on the slip");
                }
                render_slip(self.bridge.update_stake(&bet_id, amount))
            }
            Command::Mode(mode) => {
                if mode == SlipMode::Parlay && self.bridge.slip().len() < 2 {
                    return "a parlay needs at least two selections".to_string();
                }
                render_slip(self.bridge.set_mode(mode))
            }
            Command::Clear => render_slip(self.bridge.clear()),
            Command::Show => render_slip(self.bridge.slip()),
            Command::Bets => match self.bets.list(self.bridge.user_id()).await {
                Ok(bets) => render_bets(&bets),
                Err(err) => {
                    warn!(target: "session", error = %err, "failed to list placed bets");
                    format!("could not load placed bets: {err}")
                }
            },
            Command::Help => HELP.to_string(),
            Command::Place | Command::Quit => String::new(),
        }
    }

    pub fn bridge(&self) -> &SyncBridge {
        &self.bridge
    }

    pub fn into_bridge(self) -> SyncBridge {
        self.bridge
    }
}

fn spawn_stage_printer(mut rx: watch::Receiver<PlacementStage>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let stage = *rx.borrow_and_update();
            match stage {
                PlacementStage::Validating => println!("validating..."),
                PlacementStage::Processing => println!("processing..."),
                PlacementStage::Success => println!("success"),
                PlacementStage::Idle => {}
            }
        }
    })
}

pub fn render_slip(slip: &Slip) -> String {
    if slip.is_empty() {
        return "slip is empty".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "{} slip, {} leg(s)", slip.mode(), slip.len());
    for leg in slip.legs() {
        let _ = writeln!(
            out,
            "  [{}] {} ({}) {} stake {:.2} to win {:.2}",
            leg.id,
            leg.description(),
            leg.game.matchup(),
            leg.odds,
            leg.stake,
            leg.potential_payout
        );
    }
    if slip.mode() == SlipMode::Parlay {
        let _ = writeln!(out, "  combined odds {}", format_american(slip.combined_odds()));
    }
    let _ = write!(
        out,
        "  total stake {:.2}, potential payout {:.2}",
        slip.total_stake(),
        slip.total_payout()
    );
    out
}

pub fn render_placed(bet: &PlacedBet) -> String {
    format!(
        "{} {} {} stake {:.2} to win {:.2}",
        bet.placed_at.format("%Y-%m-%d %H:%M"),
        bet.description(),
        format_american(bet.odds),
        bet.stake,
        bet.potential_payout
    )
}

pub fn render_bets(bets: &[PlacedBet]) -> String {
    if bets.is_empty() {
        return "no placed bets".to_string();
    }
    bets.iter()
        .map(render_placed)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_games(games: &[CatalogGame]) -> String {
    if games.is_empty() {
        return "no games in the catalog".to_string();
    }

    let mut out = String::new();
    for game in games {
        let _ = writeln!(out, "{} {}", game.id, game.snapshot().matchup());
        if let Some(spread) = &game.odds.spread {
            let _ = writeln!(
                out,
                "  spread   {} {} {} / {} {} {}",
                game.away_team,
                spread.away.line.map(format_line).unwrap_or_default(),
                spread.away.odds,
                game.home_team,
                spread.home.line.map(format_line).unwrap_or_default(),
                spread.home.odds
            );
        }
        if let Some(ml) = &game.odds.moneyline {
            let _ = writeln!(
                out,
                "  ml       {} {} / {} {}",
                game.away_team, ml.away.odds, game.home_team, ml.home.odds
            );
        }
        if let Some(total) = &game.odds.total {
            let _ = writeln!(
                out,
                "  total    o{} {} / u{} {}",
                total.over.line.unwrap_or_default(),
                total.over.odds,
                total.under.line.unwrap_or_default(),
                total.under.odds
            );
        }
        for (label, table) in [
            ("period", &game.odds.period_winners),
            ("quarter", &game.odds.quarter_winners),
            ("half", &game.odds.half_winners),
        ] {
            for (sub, quotes) in table {
                let _ = writeln!(
                    out,
                    "  {label} {sub}  {} / {}",
                    quotes.away.odds, quotes.home.odds
                );
            }
        }
        for prop in &game.player_props {
            let _ = writeln!(
                out,
                "  prop [{}] {} {} {} o{} / u{}",
                prop.id,
                prop.player_name,
                prop.stat_type,
                prop.line,
                prop.over_odds,
                prop.under_odds
            );
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slip::tests::{game, odds};
    use crate::slip::{BetRequest, Market, Selection, SlipParams};
    use crate::storage::MemoryStore;

    const CATALOG: &str = r#"{
      "games": [{
        "id": "g1",
        "home_team": "KC",
        "away_team": "BUF",
        "odds": {
          "moneyline": {
            "home": { "odds": -150, "last_updated": "2024-01-01T00:00:00Z" },
            "away": { "odds": 130, "last_updated": "2024-01-01T00:00:00Z" }
          },
          "total": {
            "over": { "odds": -110, "line": 47.5, "last_updated": "2024-01-01T00:00:00Z" },
            "under": { "odds": -110, "line": 47.5, "last_updated": "2024-01-01T00:00:00Z" }
          }
        }
      }]
    }"#;

    fn session() -> Session {
        let store = Arc::new(MemoryStore::default());
        let bridge = SyncBridge::new("demo", SlipParams::default(), store.clone(), None);
        let placer = BetPlacer::new(store.clone(), crate::placement::PlacementDelays::none());
        Session::new(GameCatalog::from_json(CATALOG).unwrap(), bridge, placer, store)
    }

    fn add(market: Market, selection: Selection) -> Command {
        Command::Add {
            game_id: "g1".into(),
            market,
            selection,
            sub_period: None,
            prop_id: None,
        }
    }

    #[tokio::test]
    async fn add_resolves_odds_through_catalog() {
        let mut s = session();
        let out = s.apply(add(Market::Moneyline, Selection::Away)).await;
        assert!(out.contains("BUF ML"), "{out}");
        let leg = s.bridge().slip().leg("g1-moneyline-away").unwrap();
        assert_eq!(leg.odds.value(), 130);
    }

    #[tokio::test]
    async fn catalog_errors_leave_slip_alone() {
        let mut s = session();
        let out = s.apply(add(Market::Spread, Selection::Home)).await;
        assert!(out.contains("not offered"), "{out}");
        assert!(s.bridge().slip().is_empty());
    }

    #[tokio::test]
    async fn parlay_needs_two_legs() {
        let mut s = session();
        s.apply(add(Market::Moneyline, Selection::Home)).await;
        let out = s.apply(Command::Mode(SlipMode::Parlay)).await;
        assert_eq!(out, "a parlay needs at least two selections");
        assert_eq!(s.bridge().slip().mode(), SlipMode::Single);

        s.apply(add(Market::Total, Selection::Over)).await;
        let out = s.apply(Command::Mode(SlipMode::Parlay)).await;
        assert!(out.starts_with("parlay slip, 2 leg(s)"), "{out}");
        assert!(out.contains("combined odds"), "{out}");
    }

    #[tokio::test]
    async fn unknown_leg_is_reported() {
        let mut s = session();
        let out = s
            .apply(Command::Stake {
                bet_id: "nope".into(),
                amount: 5.0,
            })
            .await;
        assert_eq!(out, "no bet nope on the slip");
    }

    #[test]
    fn renders_slip_totals() {
        let params = SlipParams::default();
        let slip = crate::slip::store::add_bet(
            &Slip::empty(),
            &params,
            BetRequest::new(game("g9"), Market::Moneyline, Selection::Home, odds(-110)),
        );
        let out = render_slip(&slip);
        assert!(out.contains("[g9-moneyline-home] KC ML (BUF @ KC) -110 stake 10.00 to win 19.09"), "{out}");
        assert!(out.ends_with("total stake 10.00, potential payout 19.09"), "{out}");
        assert_eq!(render_slip(&Slip::empty()), "slip is empty");
    }
}
