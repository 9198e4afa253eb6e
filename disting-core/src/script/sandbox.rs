//! Fault boundary around every script callback.
//!
//! A callback that errors or panics has no effect: parameter values it
//! changed are rolled back, the fault is logged and raised as an error
//! notification, and the caller gets `None`. Nothing propagates to the
//! frame loop.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use super::{ScriptContext, ScriptError, ScriptResult};
use crate::notify::Notifications;

#[derive(Debug, Clone, Default)]
pub struct Sandbox {
    frame_budget: Option<Duration>,
    last_fault: Option<String>,
    faults: u64,
}

impl Sandbox {
    pub fn new(frame_budget: Option<Duration>) -> Self {
        Self {
            frame_budget,
            last_fault: None,
            faults: 0,
        }
    }

    /// Faults recovered since the sandbox was created.
    pub fn fault_count(&self) -> u64 {
        self.faults
    }

    pub fn last_fault(&self) -> Option<&str> {
        self.last_fault.as_deref()
    }

    /// Run one callback. `now` is engine time, used to stamp notifications.
    pub fn safe_call<T>(
        &mut self,
        label: &str,
        ctx: &mut ScriptContext,
        notifications: &mut Notifications,
        now: f64,
        call: impl FnOnce(&mut ScriptContext) -> ScriptResult<T>,
    ) -> Option<T> {
        let snapshot = ctx.params.values();
        let started = Instant::now();

        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| call(ctx))) {
            Ok(result) => result,
            Err(payload) => Err(ScriptError::Panicked(panic_message(payload.as_ref()))),
        };

        let took = started.elapsed();
        if let Some(budget) = self.frame_budget {
            if took > budget {
                let message = format!(
                    "{}() took {:.1}ms (budget {}ms)",
                    label,
                    took.as_secs_f64() * 1000.0,
                    budget.as_millis()
                );
                if notifications.warning(message.clone(), now) {
                    log::warn!(target: "engine::sandbox", "{}", message);
                }
            }
        }

        match outcome {
            Ok(value) => Some(value),
            Err(e) => {
                ctx.params.restore_values(&snapshot);
                self.report(label, &e, notifications, now);
                None
            }
        }
    }

    fn report(&mut self, label: &str, error: &ScriptError, notifications: &mut Notifications, now: f64) {
        self.faults += 1;
        let message = format!("{}(): {}", label, error);
        if self.last_fault.as_deref() == Some(message.as_str()) {
            log::debug!(target: "engine::sandbox", "{}", message);
        } else {
            log::warn!(target: "engine::sandbox", "{}", message);
        }
        notifications.error(message.clone(), now);
        self.last_fault = Some(message);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationLevel;
    use crate::script::DisplayList;
    use crate::state::{ParameterAddressing, ParameterList};
    use disting_types::{ParamSpec, ParamUnit};

    fn params() -> ParameterList {
        ParameterList::from_specs(&[ParamSpec::Integer {
            name: "Steps".to_string(),
            min: 0,
            max: 10,
            default: 5,
            unit: ParamUnit::None,
        }])
    }

    #[test]
    fn ok_results_pass_through() {
        let mut sandbox = Sandbox::new(None);
        let mut params = params();
        let mut display = DisplayList::new();
        let mut ctx = ScriptContext {
            params: &mut params,
            addressing: ParameterAddressing::default(),
            display: &mut display,
        };
        let mut notes = Notifications::default();
        let out = sandbox.safe_call("step", &mut ctx, &mut notes, 0.0, |ctx| {
            ctx.params.set_value(1, 7.0);
            Ok(3)
        });
        assert_eq!(out, Some(3));
        assert_eq!(params.value(1), Some(7.0));
        assert!(notes.is_empty());
    }

    #[test]
    fn errors_roll_back_and_notify() {
        let mut sandbox = Sandbox::new(None);
        let mut params = params();
        let mut display = DisplayList::new();
        let mut ctx = ScriptContext {
            params: &mut params,
            addressing: ParameterAddressing::default(),
            display: &mut display,
        };
        let mut notes = Notifications::default();
        let out: Option<()> = sandbox.safe_call("gate", &mut ctx, &mut notes, 1.0, |ctx| {
            ctx.params.set_value(1, 9.0);
            Err(ScriptError::Runtime("attempt to index nil".to_string()))
        });
        assert!(out.is_none());
        assert_eq!(params.value(1), Some(5.0));
        assert_eq!(notes.count(NotificationLevel::Error), 1);
        assert!(notes.latest().unwrap().message.contains("attempt to index nil"));
        assert_eq!(sandbox.fault_count(), 1);
    }

    #[test]
    fn panics_are_contained() {
        let mut sandbox = Sandbox::new(None);
        let mut params = params();
        let mut display = DisplayList::new();
        let mut ctx = ScriptContext {
            params: &mut params,
            addressing: ParameterAddressing::default(),
            display: &mut display,
        };
        let mut notes = Notifications::default();
        let out: Option<()> = sandbox.safe_call("step", &mut ctx, &mut notes, 0.0, |_| panic!("boom"));
        assert!(out.is_none());
        assert_eq!(sandbox.last_fault(), Some("step(): script panicked: boom"));
    }

    #[test]
    fn repeated_faults_coalesce() {
        let mut sandbox = Sandbox::new(None);
        let mut params = params();
        let mut display = DisplayList::new();
        let mut ctx = ScriptContext {
            params: &mut params,
            addressing: ParameterAddressing::default(),
            display: &mut display,
        };
        let mut notes = Notifications::default();
        for frame in 0..10 {
            let _: Option<()> = sandbox.safe_call("step", &mut ctx, &mut notes, frame as f64 / 60.0, |_| {
                Err(ScriptError::BudgetExceeded)
            });
        }
        assert_eq!(notes.len(), 1);
        assert_eq!(sandbox.fault_count(), 10);
    }

    #[test]
    fn slow_callbacks_warn() {
        let mut sandbox = Sandbox::new(Some(Duration::from_millis(1)));
        let mut params = params();
        let mut display = DisplayList::new();
        let mut ctx = ScriptContext {
            params: &mut params,
            addressing: ParameterAddressing::default(),
            display: &mut display,
        };
        let mut notes = Notifications::default();
        let out = sandbox.safe_call("step", &mut ctx, &mut notes, 0.0, |_| {
            std::thread::sleep(Duration::from_millis(5));
            Ok(())
        });
        assert_eq!(out, Some(()));
        assert_eq!(notes.count(NotificationLevel::Warning), 1);
    }
}
