//! Rate store: the single source of truth for displayed rates.
//!
//! State is owned by the composition root and handed to the view layer by
//! reference. Every mutation goes through one reducer path under a single
//! lock, so readers never observe a half-applied update.

use crate::core::notify::Notifier;
use crate::core::rate::{Rate, RatePatch, RateSource, Tab};
use crate::core::throttle::{self, RefreshGate};
use crate::providers::util::is_connectivity_error;
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Generic message surfaced in state when a refresh fails.
pub const REFRESH_ERROR_MESSAGE: &str = "Error al actualizar las cotizaciones";

#[derive(Debug, Clone)]
pub struct StoreState {
    pub rates: Vec<Rate>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
    pub is_online: bool,
    pub active_tab: Tab,
    pub has_initial_load_attempt: bool,
    pub last_manual_update: Option<DateTime<Utc>>,
}

impl Default for StoreState {
    fn default() -> Self {
        StoreState {
            rates: Vec::new(),
            is_loading: false,
            error: None,
            last_update: None,
            is_online: true,
            active_tab: Tab::All,
            has_initial_load_attempt: false,
            last_manual_update: None,
        }
    }
}

/// Reducer actions. Each one is applied atomically.
enum Action {
    SetLoading(bool),
    SetRates(Vec<Rate>),
    SetError(Option<String>),
    UpdateRate { id: String, patch: RatePatch },
    SetOnline(bool),
    SetActiveTab(Tab),
    MarkInitialLoadAttempt,
    StampManualRefresh,
}

fn reduce(state: &mut StoreState, action: Action) {
    match action {
        Action::SetLoading(loading) => state.is_loading = loading,
        Action::SetRates(rates) => {
            state.rates = rates;
            state.is_loading = false;
            state.error = None;
            state.last_update = Some(Utc::now());
        }
        Action::SetError(error) => {
            state.error = error;
            state.is_loading = false;
        }
        Action::UpdateRate { id, patch } => {
            // Unknown ids are a no-op, not an error.
            if let Some(rate) = state.rates.iter_mut().find(|r| r.id == id) {
                rate.apply(patch, Utc::now());
            }
        }
        Action::SetOnline(online) => state.is_online = online,
        Action::SetActiveTab(tab) => state.active_tab = tab,
        Action::MarkInitialLoadAttempt => state.has_initial_load_attempt = true,
        Action::StampManualRefresh => state.last_manual_update = Some(Utc::now()),
    }
}

/// Outcome of a refresh attempt, reported to the caller for display purposes.
/// The authoritative result always lives in store state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated(usize),
    Failed,
    SkippedInFlight,
    Throttled { remaining_ms: i64 },
}

pub struct RateStore {
    state: RwLock<StoreState>,
    source: Arc<dyn RateSource>,
    notifier: Box<dyn Notifier>,
}

impl RateStore {
    pub fn new(source: Arc<dyn RateSource>, notifier: Box<dyn Notifier>) -> Self {
        RateStore {
            state: RwLock::new(StoreState::default()),
            source,
            notifier,
        }
    }

    pub fn snapshot(&self) -> StoreState {
        self.state.read().unwrap().clone()
    }

    fn dispatch(&self, action: Action) {
        let mut state = self.state.write().unwrap();
        reduce(&mut state, action);
    }

    /// Gate for manual refreshes, derived from the stored timestamp.
    pub fn refresh_gate(&self) -> RefreshGate {
        throttle::can_refresh(self.state.read().unwrap().last_manual_update)
    }

    /// Marks the start of a refresh under one lock hold, so concurrent
    /// callers cannot both pass the in-flight and cooldown checks.
    fn begin_refresh(&self, is_manual: bool) -> Result<(), RefreshOutcome> {
        let mut state = self.state.write().unwrap();
        if state.is_loading {
            debug!("Refresh already in flight, skipping");
            return Err(RefreshOutcome::SkippedInFlight);
        }
        if is_manual {
            let gate = throttle::can_refresh(state.last_manual_update);
            if !gate.allowed {
                debug!(remaining_ms = gate.remaining_ms, "Manual refresh throttled");
                return Err(RefreshOutcome::Throttled {
                    remaining_ms: gate.remaining_ms,
                });
            }
            // The cooldown starts when the gate grants the attempt, not when
            // it succeeds; a failing API must not reopen the gate.
            reduce(&mut state, Action::StampManualRefresh);
        }
        reduce(&mut state, Action::SetLoading(true));
        reduce(&mut state, Action::SetError(None));
        reduce(&mut state, Action::MarkInitialLoadAttempt);
        Ok(())
    }

    /// Replaces the rate set wholesale from the configured source.
    ///
    /// On failure the previous rates stay untouched and a generic error is
    /// recorded. Callers are expected to consult [`RateStore::refresh_gate`]
    /// before a manual refresh; the store re-checks at this boundary anyway.
    pub async fn refresh_rates(&self, show_notice: bool, is_manual: bool) -> RefreshOutcome {
        if let Err(outcome) = self.begin_refresh(is_manual) {
            return outcome;
        }

        match self.source.fetch_rates().await {
            Ok(rates) => {
                let count = rates.len();
                {
                    let mut state = self.state.write().unwrap();
                    reduce(&mut state, Action::SetRates(rates));
                    reduce(&mut state, Action::SetOnline(true));
                }
                debug!(count, "Rates refreshed");
                if show_notice && count > 0 {
                    self.notifier.success(
                        "Tasas actualizadas correctamente",
                        &format!("Se actualizaron {count} cotizaciones"),
                    );
                }
                RefreshOutcome::Updated(count)
            }
            Err(e) => {
                warn!(error = ?e, "Failed to refresh rates");
                let offline = is_connectivity_error(&e);
                {
                    let mut state = self.state.write().unwrap();
                    reduce(
                        &mut state,
                        Action::SetError(Some(REFRESH_ERROR_MESSAGE.to_string())),
                    );
                    if offline {
                        reduce(&mut state, Action::SetOnline(false));
                    }
                }
                if show_notice {
                    self.notifier.failure(
                        "Error al actualizar las tasas",
                        "No se pudieron cargar las cotizaciones",
                    );
                }
                RefreshOutcome::Failed
            }
        }
    }

    /// Triggers the one automatic load of a session. Later empty states do
    /// not re-trigger: the attempt flag latches after the first try.
    pub async fn initial_load(&self) {
        let should_load = {
            let state = self.state.read().unwrap();
            state.rates.is_empty() && !state.has_initial_load_attempt
        };
        if should_load {
            self.refresh_rates(false, false).await;
        }
    }

    pub fn update_rate(&self, id: &str, patch: RatePatch) {
        self.dispatch(Action::UpdateRate {
            id: id.to_string(),
            patch,
        });
    }

    pub fn clear_error(&self) {
        self.dispatch(Action::SetError(None));
    }

    pub fn set_active_tab(&self, tab: Tab) {
        self.dispatch(Action::SetActiveTab(tab));
    }

    pub fn set_online(&self, online: bool) {
        self.dispatch(Action::SetOnline(online));
    }
}
