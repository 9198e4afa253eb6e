//! Rhai scripting host.
//!
//! A script is a Rhai source file that may define:
//! - `fn init()` returning a map `#{ inputs, outputs, inputNames, outputNames, parameters }`
//! - `fn step(dt, inputs)` returning an output array or `()`
//! - `fn gate(input, rising)` / `fn trigger(input)` with the same return contract
//! - `fn draw()`
//! - `fn button(index, pressed)`, `fn pot(index, value)`, `fn encoder(index, delta)`
//!
//! Per-instance state lives on `this`, an object map bound to every call.
//! `()` elements of a returned array leave that output untouched.
//!
//! Host API:
//! - `getParameter(alg, p)`, `setParameter(alg, p, v)`
//! - `getParameterNormalized(alg, p)`, `setParameterNormalized(alg, p, v)`
//! - `findParameter(alg, name)`, `getCurrentAlgorithm()`, `parameterOffset()`
//! - `drawText(x, y, text[, colour])`, `drawLine(x1, y1, x2, y2[, colour])`,
//!   `drawRectangle(...)` (filled), `drawBox(...)` (outline)
//! - `print(value)` goes to the log under the `script` target

use std::cell::RefCell;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::rc::Rc;

use disting_types::{
    ControlEvent, ParamSpec, ParamUnit, ScriptChannelSpec, ScriptInputType, ScriptOutputType,
    ScriptSchema,
};
use rhai::{
    Array, CallFnOptions, Dynamic, Engine, EvalAltResult, FuncArgs, ImmutableString, Map, Scope,
    AST, FLOAT, INT,
};

use super::display::{DisplayList, MAX_COLOUR};
use super::{OutputFrame, Script, ScriptContext, ScriptError, ScriptResult};
use crate::config::EngineSettings;
use crate::state::{ParameterAddressing, ParameterList};

/// Upper bound on declared script inputs or outputs.
const MAX_SCRIPT_CHANNELS: usize = 64;

/// State the host API functions see during a call. Filled from the
/// caller's [`ScriptContext`] on entry and handed back on exit.
#[derive(Default)]
struct HostBridge {
    params: ParameterList,
    display: DisplayList,
    addressing: ParameterAddressing,
}

/// Lends a context's parameters and display to the bridge; returns them
/// when dropped, including on unwind.
struct Lend<'a, 'b> {
    bridge: &'a RefCell<HostBridge>,
    ctx: &'a mut ScriptContext<'b>,
}

impl<'a, 'b> Lend<'a, 'b> {
    fn new(bridge: &'a RefCell<HostBridge>, ctx: &'a mut ScriptContext<'b>) -> ScriptResult<Self> {
        let mut host = bridge
            .try_borrow_mut()
            .map_err(|_| ScriptError::Runtime("script host re-entered".to_string()))?;
        host.params = mem::take(ctx.params);
        host.display = mem::take(ctx.display);
        host.addressing = ctx.addressing;
        drop(host);
        Ok(Self { bridge, ctx })
    }
}

impl Drop for Lend<'_, '_> {
    fn drop(&mut self) {
        if let Ok(mut host) = self.bridge.try_borrow_mut() {
            *self.ctx.params = mem::take(&mut host.params);
            *self.ctx.display = mem::take(&mut host.display);
        }
    }
}

struct RhaiRuntime {
    engine: Engine,
    ast: AST,
    scope: Scope<'static>,
    this: Dynamic,
    bridge: Rc<RefCell<HostBridge>>,
}

impl RhaiRuntime {
    fn has_fn(&self, name: &str, arity: usize) -> bool {
        self.ast
            .iter_functions()
            .any(|f| f.name == name && f.params.len() == arity)
    }

    fn call(&mut self, ctx: &mut ScriptContext, name: &str, args: impl FuncArgs) -> ScriptResult<Dynamic> {
        let _lent = Lend::new(&self.bridge, ctx)?;
        let options = CallFnOptions::new()
            .eval_ast(false)
            .rewind_scope(true)
            .bind_this_ptr(&mut self.this);
        self.engine
            .call_fn_with_options::<Dynamic>(options, &mut self.scope, &self.ast, name, args)
            .map_err(eval_error)
    }
}

type SharedRuntime = Rc<RefCell<RhaiRuntime>>;

fn call_shared(
    runtime: &SharedRuntime,
    ctx: &mut ScriptContext,
    name: &str,
    args: impl FuncArgs,
) -> ScriptResult<Dynamic> {
    let mut rt = runtime
        .try_borrow_mut()
        .map_err(|_| ScriptError::Runtime(format!("{}() re-entered", name)))?;
    rt.call(ctx, name, args)
}

fn eval_error(err: Box<EvalAltResult>) -> ScriptError {
    if out_of_operations(&err) {
        ScriptError::BudgetExceeded
    } else {
        ScriptError::Runtime(err.to_string())
    }
}

fn out_of_operations(err: &EvalAltResult) -> bool {
    match err {
        EvalAltResult::ErrorTooManyOperations(_) => true,
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => out_of_operations(inner),
        _ => false,
    }
}

/// Read and load a Rhai script file.
pub fn load_rhai_file(path: &Path, settings: &EngineSettings) -> ScriptResult<Script> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| ScriptError::Io(format!("{}: {}", path.display(), e)))?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("script")
        .to_string();
    load_rhai_script(&name, &source, settings)
}

/// Compile a script, run its `init()` and wire up whichever callbacks it defines.
pub fn load_rhai_script(name: &str, source: &str, settings: &EngineSettings) -> ScriptResult<Script> {
    let bridge = Rc::new(RefCell::new(HostBridge::default()));
    let mut engine = build_engine(settings.max_operations);
    register_host_api(&mut engine, &bridge);

    let ast = engine
        .compile(source)
        .map_err(|e| ScriptError::Compile(e.to_string()))?;

    let mut runtime = RhaiRuntime {
        engine,
        ast,
        scope: Scope::new(),
        this: Dynamic::from_map(Map::new()),
        bridge,
    };

    let schema = if runtime.has_fn("init", 0) {
        let mut params = ParameterList::default();
        let mut display = DisplayList::new();
        let mut ctx = ScriptContext {
            params: &mut params,
            addressing: ParameterAddressing::new(settings.parameter_offset),
            display: &mut display,
        };
        let value = panic::catch_unwind(AssertUnwindSafe(|| runtime.call(&mut ctx, "init", ())))
            .map_err(|_| ScriptError::Panicked("init() panicked".to_string()))??;
        parse_schema(&value)?
    } else {
        log::info!(target: "script", "{} has no init(); declaring no channels", name);
        ScriptSchema::default()
    };

    log::info!(
        target: "script",
        "loaded {}: {} inputs, {} outputs, {} parameters",
        name,
        schema.input_count(),
        schema.output_count(),
        schema.parameters.len()
    );

    Ok(wire_callbacks(name, schema, runtime))
}

fn build_engine(max_operations: u64) -> Engine {
    let mut engine = Engine::new();
    engine.set_max_expr_depths(64, 64);
    engine.set_max_call_levels(64);
    engine.set_max_operations(max_operations);
    engine.set_max_string_size(10_000);
    engine.set_max_array_size(1_024);
    engine.set_max_map_size(512);
    engine.on_print(|text| log::info!(target: "script", "{}", text));
    engine.on_debug(|text, _source, pos| log::debug!(target: "script", "{:?} {}", pos, text));
    engine
}

fn wire_callbacks(name: &str, schema: ScriptSchema, runtime: RhaiRuntime) -> Script {
    let has_step = runtime.has_fn("step", 2);
    let has_gate = runtime.has_fn("gate", 2);
    let has_trigger = runtime.has_fn("trigger", 1);
    let has_draw = runtime.has_fn("draw", 0);
    let controls = [
        runtime.has_fn("button", 2),
        runtime.has_fn("pot", 2),
        runtime.has_fn("encoder", 2),
    ];

    let runtime: SharedRuntime = Rc::new(RefCell::new(runtime));
    let mut script = Script::new(name, schema);

    if has_step {
        let rt = runtime.clone();
        script = script.on_step(move |ctx, dt, inputs| {
            let inputs: Array = inputs.iter().map(|v| Dynamic::from_float(*v as FLOAT)).collect();
            let value = call_shared(&rt, ctx, "step", (dt as FLOAT, inputs))?;
            to_output_frame("step", value)
        });
    }
    if has_gate {
        let rt = runtime.clone();
        script = script.on_gate(move |ctx, input, rising| {
            let value = call_shared(&rt, ctx, "gate", (input as INT, rising))?;
            to_output_frame("gate", value)
        });
    }
    if has_trigger {
        let rt = runtime.clone();
        script = script.on_trigger(move |ctx, input| {
            let value = call_shared(&rt, ctx, "trigger", (input as INT,))?;
            to_output_frame("trigger", value)
        });
    }
    if has_draw {
        let rt = runtime.clone();
        script = script.on_draw(move |ctx| call_shared(&rt, ctx, "draw", ()).map(|_| ()));
    }
    if controls.iter().any(|c| *c) {
        let [button, pot, encoder] = controls;
        let rt = runtime;
        script = script.on_control(move |ctx, event| {
            let (callback, value) = match event {
                ControlEvent::Button { index, pressed } if button => {
                    ("button", call_shared(&rt, ctx, "button", (index as INT, pressed))?)
                }
                ControlEvent::Pot { index, value } if pot => {
                    ("pot", call_shared(&rt, ctx, "pot", (index as INT, value as FLOAT))?)
                }
                ControlEvent::Encoder { index, delta } if encoder => {
                    ("encoder", call_shared(&rt, ctx, "encoder", (index as INT, delta as INT))?)
                }
                _ => return Ok(None),
            };
            to_output_frame(callback, value)
        });
    }

    script
}

fn register_host_api(engine: &mut Engine, bridge: &Rc<RefCell<HostBridge>>) {
    let b = bridge.clone();
    engine.register_fn("getParameter", move |alg: INT, p: INT| -> Dynamic {
        let host = b.borrow();
        match host.addressing.get(&host.params, alg, p) {
            Some(v) => Dynamic::from_float(v as FLOAT),
            None => Dynamic::UNIT,
        }
    });

    let b = bridge.clone();
    engine.register_fn("getParameterNormalized", move |alg: INT, p: INT| -> Dynamic {
        let host = b.borrow();
        match host.addressing.get_normalized(&host.params, alg, p) {
            Some(v) => Dynamic::from_float(v as FLOAT),
            None => Dynamic::UNIT,
        }
    });

    let b = bridge.clone();
    engine.register_fn("setParameter", move |alg: INT, p: INT, v: FLOAT| {
        let mut host = b.borrow_mut();
        let host = &mut *host;
        host.addressing.set(&mut host.params, alg, p, v as f32);
    });
    let b = bridge.clone();
    engine.register_fn("setParameter", move |alg: INT, p: INT, v: INT| {
        let mut host = b.borrow_mut();
        let host = &mut *host;
        host.addressing.set(&mut host.params, alg, p, v as f32);
    });

    let b = bridge.clone();
    engine.register_fn("setParameterNormalized", move |alg: INT, p: INT, v: FLOAT| {
        let mut host = b.borrow_mut();
        let host = &mut *host;
        host.addressing.set_normalized(&mut host.params, alg, p, v as f32);
    });
    let b = bridge.clone();
    engine.register_fn("setParameterNormalized", move |alg: INT, p: INT, v: INT| {
        let mut host = b.borrow_mut();
        let host = &mut *host;
        host.addressing.set_normalized(&mut host.params, alg, p, v as f32);
    });

    let b = bridge.clone();
    engine.register_fn("findParameter", move |alg: INT, name: ImmutableString| -> Dynamic {
        let host = b.borrow();
        match host.addressing.find(&host.params, alg, name.as_str()) {
            Some(p) => Dynamic::from_int(p),
            None => Dynamic::UNIT,
        }
    });

    engine.register_fn("getCurrentAlgorithm", || -> INT { ParameterAddressing::ALGORITHM });

    let b = bridge.clone();
    engine.register_fn("parameterOffset", move || -> INT { b.borrow().addressing.offset as INT });

    let b = bridge.clone();
    engine.register_fn("drawText", move |x: INT, y: INT, text: ImmutableString| {
        b.borrow_mut().display.text(x, y, text.as_str(), MAX_COLOUR as INT);
    });
    let b = bridge.clone();
    engine.register_fn("drawText", move |x: INT, y: INT, text: ImmutableString, colour: INT| {
        b.borrow_mut().display.text(x, y, text.as_str(), colour);
    });

    let b = bridge.clone();
    engine.register_fn("drawLine", move |x1: INT, y1: INT, x2: INT, y2: INT| {
        b.borrow_mut().display.line(x1, y1, x2, y2, MAX_COLOUR as INT);
    });
    let b = bridge.clone();
    engine.register_fn("drawLine", move |x1: INT, y1: INT, x2: INT, y2: INT, colour: INT| {
        b.borrow_mut().display.line(x1, y1, x2, y2, colour);
    });

    for (name, filled) in [("drawRectangle", true), ("drawBox", false)] {
        let b = bridge.clone();
        engine.register_fn(name, move |x1: INT, y1: INT, x2: INT, y2: INT| {
            b.borrow_mut()
                .display
                .rectangle(x1, y1, x2, y2, MAX_COLOUR as INT, filled);
        });
        let b = bridge.clone();
        engine.register_fn(name, move |x1: INT, y1: INT, x2: INT, y2: INT, colour: INT| {
            b.borrow_mut().display.rectangle(x1, y1, x2, y2, colour, filled);
        });
    }
}

/// `()` means "leave outputs as they are"; an array maps slot by slot.
fn to_output_frame(callback: &str, value: Dynamic) -> ScriptResult<Option<OutputFrame>> {
    if value.is_unit() {
        return Ok(None);
    }
    if !value.is_array() {
        return Err(invalid(callback, format!("a {} instead of an array", value.type_name())));
    }
    let items = value
        .into_array()
        .map_err(|t| invalid(callback, format!("a {}", t)))?;
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            if item.is_unit() {
                Ok(None)
            } else {
                number(&item)
                    .map(|v| Some(v as f32))
                    .ok_or_else(|| invalid(callback, format!("a {} at output {}", item.type_name(), i + 1)))
            }
        })
        .collect::<ScriptResult<OutputFrame>>()
        .map(Some)
}

fn invalid(callback: &str, reason: String) -> ScriptError {
    ScriptError::InvalidReturn {
        callback: callback.to_string(),
        reason,
    }
}

fn number(value: &Dynamic) -> Option<f64> {
    value
        .as_float()
        .ok()
        .or_else(|| value.as_int().ok().map(|i| i as f64))
}

fn string(value: &Dynamic) -> Option<String> {
    value.clone().into_string().ok()
}

/// Turn the map returned by `init()` into a schema.
pub fn parse_schema(value: &Dynamic) -> ScriptResult<ScriptSchema> {
    let map = value
        .clone()
        .try_cast::<Map>()
        .ok_or_else(|| invalid("init", format!("a {} instead of a map", value.type_name())))?;

    let mut inputs = match map.get("inputs") {
        Some(v) => parse_channels(v, "inputs", ScriptInputType::parse)?,
        None => Vec::new(),
    };
    let mut outputs = match map.get("outputs") {
        Some(v) => parse_channels(v, "outputs", ScriptOutputType::parse)?,
        None => Vec::new(),
    };
    apply_names(&mut inputs, map.get("inputNames"));
    apply_names(&mut outputs, map.get("outputNames"));

    let parameters = match map.get("parameters") {
        Some(v) if v.is_unit() => Vec::new(),
        Some(v) => {
            let entries = v
                .clone()
                .into_array()
                .map_err(|t| invalid("init", format!("parameters as a {}", t)))?;
            entries
                .iter()
                .enumerate()
                .map(|(i, entry)| parse_parameter(entry).map_err(|reason| invalid("init", format!("parameter {}: {}", i + 1, reason))))
                .collect::<ScriptResult<Vec<_>>>()?
        }
        None => Vec::new(),
    };

    Ok(ScriptSchema {
        inputs,
        outputs,
        parameters,
    })
}

/// A count (all channels of the default kind) or an array of kind names.
fn parse_channels<K: Default>(
    value: &Dynamic,
    field: &str,
    parse: fn(&str) -> Option<K>,
) -> ScriptResult<Vec<ScriptChannelSpec<K>>> {
    if let Ok(count) = value.as_int() {
        let count = usize::try_from(count)
            .ok()
            .filter(|c| *c <= MAX_SCRIPT_CHANNELS)
            .ok_or_else(|| invalid("init", format!("{} = {}", field, count)))?;
        return Ok((0..count).map(|_| ScriptChannelSpec::new(K::default())).collect());
    }
    let kinds = value
        .clone()
        .into_array()
        .map_err(|t| invalid("init", format!("{} as a {}", field, t)))?;
    if kinds.len() > MAX_SCRIPT_CHANNELS {
        return Err(invalid("init", format!("{} {}", kinds.len(), field)));
    }
    kinds
        .iter()
        .map(|kind| {
            string(kind)
                .and_then(|s| parse(&s))
                .map(ScriptChannelSpec::new)
                .ok_or_else(|| invalid("init", format!("unknown {} kind {}", field, kind)))
        })
        .collect()
}

fn apply_names<K>(channels: &mut [ScriptChannelSpec<K>], names: Option<&Dynamic>) {
    let Some(names) = names.and_then(|n| n.clone().into_array().ok()) else {
        return;
    };
    for (channel, name) in channels.iter_mut().zip(names.iter()) {
        if let Some(name) = string(name) {
            channel.name = Some(name);
        }
    }
}

/// `[name, min, max, default, unit]` -> Integer,
/// `[name, min, max, default, unit, scale]` -> Float,
/// `[name, [values], default]` -> Enum.
fn parse_parameter(entry: &Dynamic) -> Result<ParamSpec, String> {
    let fields = entry
        .clone()
        .into_array()
        .map_err(|t| format!("expected an array, got a {}", t))?;
    let name = fields
        .first()
        .and_then(string)
        .ok_or_else(|| "missing name".to_string())?;

    if fields.len() == 3 && fields[1].is_array() {
        let values = fields[1]
            .clone()
            .into_array()
            .unwrap_or_default()
            .iter()
            .map(|v| string(v).ok_or_else(|| format!("enum value {} is not a string", v)))
            .collect::<Result<Vec<_>, _>>()?;
        if values.is_empty() {
            return Err(format!("{} has no values", name));
        }
        let default = number(&fields[2]).ok_or_else(|| format!("{} default is not a number", name))?;
        return Ok(ParamSpec::Enum {
            name,
            values,
            default: default.max(1.0).round() as usize,
        });
    }

    if fields.len() != 5 && fields.len() != 6 {
        return Err(format!("{} has {} fields", name, fields.len()));
    }
    let min = number(&fields[1]).ok_or_else(|| format!("{} min is not a number", name))?;
    let max = number(&fields[2]).ok_or_else(|| format!("{} max is not a number", name))?;
    let default = number(&fields[3]).ok_or_else(|| format!("{} default is not a number", name))?;
    for (field, value) in [("min", min), ("max", max), ("default", default)] {
        if !(value as f32).is_finite() {
            return Err(format!("{} {} {} is out of range", name, field, value));
        }
    }
    let unit = parse_unit(&fields[4]);

    if fields.len() == 5 {
        return Ok(ParamSpec::Integer {
            name,
            min: min.round() as i32,
            max: max.round() as i32,
            default: default.round() as i32,
            unit,
        });
    }

    let scale = match fields[5].as_int() {
        Ok(s @ (1 | 10 | 100 | 1000)) => s as u16,
        _ => {
            log::warn!(target: "script", "{}: scale {} is not 1, 10, 100 or 1000; using 10", name, fields[5]);
            10
        }
    };
    Ok(ParamSpec::Float {
        name,
        min: min as f32,
        max: max as f32,
        default: default as f32,
        unit,
        scale,
    })
}

fn parse_unit(value: &Dynamic) -> ParamUnit {
    if value.is_unit() {
        return ParamUnit::None;
    }
    match string(value) {
        Some(s) => ParamUnit::parse(&s).unwrap_or_else(|| {
            log::warn!(target: "script", "unknown unit {:?}", s);
            ParamUnit::None
        }),
        None => ParamUnit::None,
    }
}
