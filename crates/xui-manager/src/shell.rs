//! Interactive menu driven as an explicit state machine.
//!
//! ```text
//! MainMenu → ScopeSelect → (ClientSearch) → ActionSelect → Confirm → Commit → Done
//! ```
//!
//! Every step can go `Back` to the state it was entered from; end of input
//! or a `0` on the main menu exits without writing anything.

use std::io::{self, BufRead, Write};

use tracing::debug;
use xui_config::RestartPolicy;
use xui_engine::{
    ApplySummary, BulkScenario, EngineError, ManualAction, Operation, PlannedChange, Reconciler,
    Scope, Snapshot, TimeAxis, TrafficAxis, now_millis,
};
use xui_store::PanelStore;

use crate::prompt::Prompt;
use crate::render;
use crate::restart::PanelRestarter;

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Where the shell currently is.
#[derive(Debug, Clone)]
pub enum ShellState {
    MainMenu,
    /// Bulk edit or single client, for one inbound or all of them.
    ScopeSelect { inbound: Option<i64> },
    ClientSearch { inbound: Option<i64> },
    ActionSelect { scope: Scope },
    Confirm { plan: Box<PlannedChange> },
    Commit { plan: Box<PlannedChange> },
    Done { summary: Option<ApplySummary> },
}

/// Result of handling one state.
#[derive(Debug)]
pub enum Transition {
    Next(ShellState),
    /// Ask again in the same state.
    Stay,
    Back,
    Exit,
    Finish(Option<ApplySummary>),
}

/// Values the shell proposes and how it handles restarts.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellSettings {
    pub days_to_add: i64,
    pub gb_to_add: f64,
    pub restart: RestartPolicy,
}

pub struct Shell<'a, S, R, W> {
    reconciler: &'a Reconciler<S>,
    restarter: &'a dyn PanelRestarter,
    snapshot: Snapshot,
    prompt: Prompt<R, W>,
    settings: ShellSettings,
    clock: fn() -> i64,
}

impl<'a, S, R, W> Shell<'a, S, R, W>
where
    S: PanelStore,
    R: BufRead,
    W: Write,
{
    /// Load the panel data and build a shell over it.
    pub async fn new(
        reconciler: &'a Reconciler<S>,
        restarter: &'a dyn PanelRestarter,
        prompt: Prompt<R, W>,
        settings: ShellSettings,
    ) -> Result<Self, ShellError> {
        let snapshot = reconciler.load().await?;
        Ok(Self {
            reconciler,
            restarter,
            snapshot,
            prompt,
            settings,
            clock: now_millis,
        })
    }

    /// Replace the wall clock.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn into_prompt(self) -> Prompt<R, W> {
        self.prompt
    }

    /// Run until the user exits or a pass is committed.
    pub async fn run(&mut self) -> Result<Option<ApplySummary>, ShellError> {
        let mut state = ShellState::MainMenu;
        let mut history: Vec<ShellState> = Vec::new();
        loop {
            let transition = match &state {
                ShellState::MainMenu => self.main_menu()?,
                ShellState::ScopeSelect { inbound } => self.scope_select(*inbound)?,
                ShellState::ClientSearch { inbound } => self.client_search(*inbound)?,
                ShellState::ActionSelect { scope } => self.action_select(scope)?,
                ShellState::Confirm { plan } => self.confirm(plan)?,
                ShellState::Commit { plan } => self.commit(plan).await?,
                ShellState::Done { summary } => Transition::Finish(summary.clone()),
            };
            debug!(?transition, "shell step");
            match transition {
                Transition::Next(next) => history.push(std::mem::replace(&mut state, next)),
                Transition::Stay => {}
                Transition::Back => state = history.pop().unwrap_or(ShellState::MainMenu),
                Transition::Exit => {
                    self.prompt.say("Bye.")?;
                    return Ok(None);
                }
                Transition::Finish(summary) => return Ok(summary),
            }
        }
    }

    fn main_menu(&mut self) -> Result<Transition, ShellError> {
        let inbounds: Vec<i64> = self.snapshot.records.inbounds().iter().map(|i| i.id).collect();
        self.prompt.say("\n=== Main menu ===")?;
        self.prompt.say("[0] Exit")?;
        self.prompt.say("[1] All inbounds")?;
        self.prompt
            .say(render::inbounds_table(&self.snapshot.records, true))?;

        let Some(choice) = self.prompt.ask_choice("Option", inbounds.len() + 1, 0)? else {
            return Ok(Transition::Exit);
        };
        Ok(match choice {
            0 => Transition::Exit,
            1 => Transition::Next(ShellState::ScopeSelect { inbound: None }),
            n => Transition::Next(ShellState::ScopeSelect {
                inbound: Some(inbounds[n - 2]),
            }),
        })
    }

    fn scope_select(&mut self, inbound: Option<i64>) -> Result<Transition, ShellError> {
        match inbound {
            Some(id) => self.prompt.say(format_args!("\n--- Inbound {id} ---"))?,
            None => self.prompt.say("\n--- All inbounds ---")?,
        }
        self.prompt.say("[1] Bulk edit every client")?;
        self.prompt.say("[2] Pick one client")?;
        self.prompt.say("[0] Back")?;

        let Some(choice) = self.prompt.ask_choice("Option", 2, 0)? else {
            return Ok(Transition::Exit);
        };
        let scope = inbound.map_or(Scope::AllInbounds, Scope::SingleInbound);
        Ok(match choice {
            1 => Transition::Next(ShellState::ActionSelect { scope }),
            2 => Transition::Next(ShellState::ClientSearch { inbound }),
            _ => Transition::Back,
        })
    }

    fn client_search(&mut self, inbound: Option<i64>) -> Result<Transition, ShellError> {
        self.prompt.say("\nType part of an email, or press enter to list everyone.")?;
        let Some(query) = self.prompt.ask_line("Search")? else {
            return Ok(Transition::Exit);
        };
        let matches = render::find_clients(&self.snapshot.records, inbound, &query);
        if matches.is_empty() {
            self.prompt.say("No client found.")?;
            return Ok(Transition::Stay);
        }
        self.prompt
            .say(render::clients_table(&matches, &self.snapshot.usage))?;
        self.prompt.say(format_args!("{} result(s)", matches.len()))?;

        let Some(row) = self.prompt.ask_choice("Row (0 back)", matches.len(), 0)? else {
            return Ok(Transition::Exit);
        };
        if row == 0 {
            return Ok(Transition::Back);
        }
        let picked = &matches[row - 1];
        self.prompt
            .say(render::client_card(picked, &self.snapshot.usage))?;
        Ok(Transition::Next(ShellState::ActionSelect {
            scope: Scope::client(picked.email.clone(), Some(picked.inbound_id)),
        }))
    }

    fn action_select(&mut self, scope: &Scope) -> Result<Transition, ShellError> {
        let op = if scope.is_single_client() {
            self.manual_action()?
        } else {
            self.bulk_scenario()?
        };
        let op = match op {
            Choice::Picked(op) => op,
            Choice::Back => return Ok(Transition::Back),
            Choice::Exit => return Ok(Transition::Exit),
        };

        match self.snapshot.evaluate(scope, &op, (self.clock)()) {
            Ok(plan) if plan.is_empty() => {
                self.prompt.say("Nothing to change.")?;
                Ok(Transition::Stay)
            }
            Ok(plan) => Ok(Transition::Next(ShellState::Confirm {
                plan: Box::new(plan),
            })),
            Err(e) => {
                self.prompt.say(format_args!("Error: {e}"))?;
                Ok(Transition::Stay)
            }
        }
    }

    fn manual_action(&mut self) -> Result<Choice<Operation>, ShellError> {
        self.prompt.say("[1] Extend time (+days)")?;
        self.prompt.say("[2] Reactivate (days from now)")?;
        self.prompt.say("[3] Add traffic (+GB)")?;
        self.prompt.say("[4] Reset usage")?;
        self.prompt.say("[5] Set manually")?;
        self.prompt.say("[0] Back")?;

        let Some(choice) = self.prompt.ask_choice("Option", 5, 0)? else {
            return Ok(Choice::Exit);
        };
        let action = match choice {
            0 => return Ok(Choice::Back),
            1 => self
                .prompt
                .ask_parsed::<i64>("Days to extend", None)?
                .map(ManualAction::ExtendDays),
            2 => self
                .prompt
                .ask_parsed::<i64>("Days valid from now", None)?
                .map(ManualAction::Reactivate),
            3 => self
                .prompt
                .ask_parsed::<f64>("GB to add", None)?
                .map(ManualAction::AddQuota),
            4 => Some(ManualAction::ResetUsage),
            _ => {
                let Some(days) = self
                    .prompt
                    .ask_parsed::<i64>("Days valid from now (0 = unlimited, -1 = keep)", Some(-1))?
                else {
                    return Ok(Choice::Exit);
                };
                let Some(gb) = self
                    .prompt
                    .ask_parsed::<f64>("Total GB (0 = unlimited, -1 = keep)", Some(-1.0))?
                else {
                    return Ok(Choice::Exit);
                };
                Some(ManualAction::ManualSet {
                    days: (days >= 0).then_some(days),
                    gb: (gb >= 0.0).then_some(gb),
                })
            }
        };
        Ok(action.map_or(Choice::Exit, |a| Choice::Picked(Operation::Manual(a))))
    }

    fn bulk_scenario(&mut self) -> Result<Choice<Operation>, ShellError> {
        self.prompt.say("\nTime rule:")?;
        self.prompt.say("[0] No change")?;
        self.prompt.say("[1] Everyone")?;
        self.prompt.say("[2] Only active clients")?;
        self.prompt.say("[3] Only expired clients")?;
        let Some(time) = self.prompt.ask_choice("Option", 3, 0)? else {
            return Ok(Choice::Exit);
        };
        let time = [TimeAxis::None, TimeAxis::All, TimeAxis::ActiveOnly, TimeAxis::ExpiredOnly][time];
        let mut days = 0;
        if time != TimeAxis::None {
            match self
                .prompt
                .ask_parsed("Days to add", Some(self.settings.days_to_add))?
            {
                Some(d) => days = d,
                None => return Ok(Choice::Exit),
            }
        }

        self.prompt.say("\nTraffic rule:")?;
        self.prompt.say("[0] No change")?;
        self.prompt.say("[1] Everyone")?;
        self.prompt.say("[2] Only depleted clients")?;
        self.prompt.say("[3] Only clients with traffic left")?;
        let Some(traffic) = self.prompt.ask_choice("Option", 3, 0)? else {
            return Ok(Choice::Exit);
        };
        let traffic = [
            TrafficAxis::None,
            TrafficAxis::All,
            TrafficAxis::DepletedOnly,
            TrafficAxis::NotDepletedOnly,
        ][traffic];
        let mut gb = 0.0;
        if traffic != TrafficAxis::None {
            match self
                .prompt
                .ask_parsed("GB to add", Some(self.settings.gb_to_add))?
            {
                Some(g) => gb = g,
                None => return Ok(Choice::Exit),
            }
        }

        Ok(Choice::Picked(Operation::Bulk(
            BulkScenario::new().time(time, days).traffic(traffic, gb),
        )))
    }

    fn confirm(&mut self, plan: &PlannedChange) -> Result<Transition, ShellError> {
        self.prompt.say(render::changes_table(plan))?;
        self.prompt.say(render::plan_summary(plan))?;
        Ok(match self.prompt.confirm("Save to the database?", false)? {
            Some(true) => Transition::Next(ShellState::Commit {
                plan: Box::new(plan.clone()),
            }),
            Some(false) => Transition::Back,
            None => Transition::Exit,
        })
    }

    async fn commit(&mut self, plan: &PlannedChange) -> Result<Transition, ShellError> {
        let summary = self.reconciler.apply(plan).await?;
        self.prompt.say(render::apply_summary(&summary))?;
        offer_restart(&mut self.prompt, self.settings.restart, self.restarter).await?;
        Ok(Transition::Next(ShellState::Done {
            summary: Some(summary),
        }))
    }
}

enum Choice<T> {
    Picked(T),
    Back,
    Exit,
}

/// Restart the panel as `policy` says. A failed restart is reported, never
/// returned: the data is already committed.
pub async fn offer_restart<R: BufRead, W: Write>(
    prompt: &mut Prompt<R, W>,
    policy: RestartPolicy,
    restarter: &dyn PanelRestarter,
) -> io::Result<()> {
    let restart = match policy {
        RestartPolicy::Never => false,
        RestartPolicy::Always => true,
        RestartPolicy::Ask => prompt
            .confirm("Restart the panel now?", false)?
            .unwrap_or(false),
    };
    if !restart {
        return Ok(());
    }
    match restarter.restart().await {
        Ok(command) => prompt.say(format_args!("Panel restarted ({command})."))?,
        Err(e) => prompt.say(format_args!("Restart failed: {e}"))?,
    }
    Ok(())
}
