//! `RuleEngine` backed by the compiled engine module running under `wasmer`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, error, info};
use wasmer::{
    Extern, ExternType, Function, Imports, Instance, Memory, Module, RuntimeError, Store, Type,
    TypedFunction, Value,
};

use crate::rule_engine::{LinearMemory, MemoryError, RuleEngine};

/// Exports taking no arguments and returning an i32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Nullary {
    Tick,
    MoveLeft,
    MoveRight,
    SoftDrop,
    RotateCw,
    RotateCcw,
    HardDrop,
    IsGameOver,
    Score,
    Lines,
    DropCap,
    DropCount,
    BoardPtr,
    Rows,
    Cols,
    ActiveColor,
}

impl Nullary {
    const ALL: [Nullary; 16] = [
        Nullary::Tick,
        Nullary::MoveLeft,
        Nullary::MoveRight,
        Nullary::SoftDrop,
        Nullary::RotateCw,
        Nullary::RotateCcw,
        Nullary::HardDrop,
        Nullary::IsGameOver,
        Nullary::Score,
        Nullary::Lines,
        Nullary::DropCap,
        Nullary::DropCount,
        Nullary::BoardPtr,
        Nullary::Rows,
        Nullary::Cols,
        Nullary::ActiveColor,
    ];

    fn export_name(self) -> &'static str {
        match self {
            Nullary::Tick => "wasm_tick",
            Nullary::MoveLeft => "wasm_move_left",
            Nullary::MoveRight => "wasm_move_right",
            Nullary::SoftDrop => "wasm_soft_drop",
            Nullary::RotateCw => "wasm_rotate_cw",
            Nullary::RotateCcw => "wasm_rotate_ccw",
            Nullary::HardDrop => "wasm_hard_drop",
            Nullary::IsGameOver => "wasm_is_game_over",
            Nullary::Score => "wasm_get_score",
            Nullary::Lines => "wasm_get_lines",
            Nullary::DropCap => "wasm_get_drop_cap",
            Nullary::DropCount => "wasm_get_drop_count",
            Nullary::BoardPtr => "wasm_get_board_ptr",
            Nullary::Rows => "wasm_get_rows",
            Nullary::Cols => "wasm_get_cols",
            Nullary::ActiveColor => "wasm_get_active_color",
        }
    }
}

struct EngineExports {
    init_game: TypedFunction<(i32, i32, i32), i32>,
    reset_game: TypedFunction<(i32, i32, i32), i32>,
    set_seed: Option<TypedFunction<i32, ()>>,
    write_active_cells: TypedFunction<i32, ()>,
    malloc: TypedFunction<i32, i32>,
    nullary: Vec<TypedFunction<(), i32>>,
}

pub struct WasmRuleEngine {
    store: Store,
    memory: Memory,
    exports: EngineExports,
}

impl WasmRuleEngine {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("reading engine module {}", path.display()))?;
        let engine = Self::from_bytes(&bytes)
            .with_context(|| format!("loading engine module {}", path.display()))?;
        info!(path = %path.display(), "engine module loaded");
        Ok(engine)
    }

    /// Compiles and instantiates a module from binary (or, with the `wat` feature, text) bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut store = Store::default();
        let module = Module::new(&store, bytes).context("compiling engine module")?;
        let (imports, imported_memory) = stub_imports(&mut store, &module)?;
        let instance = Instance::new(&mut store, &module, &imports)
            .map_err(|err| anyhow!("instantiating engine module: {err}"))?;

        let memory = match instance.exports.get_memory("memory") {
            Ok(memory) => memory.clone(),
            Err(_) => imported_memory.ok_or_else(|| anyhow!("engine module has no memory"))?,
        };

        for ctor in ["_initialize", "__wasm_call_ctors"] {
            if let Ok(init) = instance.exports.get_typed_function::<(), ()>(&store, ctor) {
                init.call(&mut store)
                    .map_err(|err| anyhow!("running {ctor}: {err}"))?;
                break;
            }
        }

        let exports = resolve_exports(&store, &instance)?;
        Ok(Self {
            store,
            memory,
            exports,
        })
    }

    fn call0(&mut self, which: Nullary) -> i32 {
        let f = &self.exports.nullary[which as usize];
        match f.call(&mut self.store) {
            Ok(v) => v,
            Err(err) => trapped(which.export_name(), &err, 0),
        }
    }

    fn start(&mut self, reset: bool, rows: i32, cols: i32, drop_limit: i32) -> bool {
        let (name, f) = if reset {
            ("wasm_reset_game", &self.exports.reset_game)
        } else {
            ("wasm_init_game", &self.exports.init_game)
        };
        match f.call(&mut self.store, rows, cols, drop_limit) {
            Ok(v) => v != 0,
            Err(err) => trapped(name, &err, false),
        }
    }
}

fn trapped<T>(export: &str, err: &RuntimeError, fallback: T) -> T {
    error!(export, "engine call trapped: {err}");
    fallback
}

fn resolve_exports(store: &Store, instance: &Instance) -> Result<EngineExports> {
    let exports = &instance.exports;
    let typed3 = |name: &str| {
        exports
            .get_typed_function::<(i32, i32, i32), i32>(store, name)
            .with_context(|| format!("engine export {name}"))
    };
    let nullary = Nullary::ALL
        .iter()
        .map(|n| {
            exports
                .get_typed_function::<(), i32>(store, n.export_name())
                .with_context(|| format!("engine export {}", n.export_name()))
        })
        .collect::<Result<Vec<_>>>()?;
    let malloc = exports
        .get_typed_function::<i32, i32>(store, "malloc")
        .or_else(|_| exports.get_typed_function::<i32, i32>(store, "_malloc"))
        .context("engine export malloc")?;

    Ok(EngineExports {
        init_game: typed3("wasm_init_game")?,
        reset_game: typed3("wasm_reset_game")?,
        set_seed: exports
            .get_typed_function::<i32, ()>(store, "wasm_set_seed")
            .ok(),
        write_active_cells: exports
            .get_typed_function::<i32, ()>(store, "wasm_write_active_cells")
            .context("engine export wasm_write_active_cells")?,
        malloc,
        nullary,
    })
}

fn zero_value(ty: &Type) -> Option<Value> {
    match ty {
        Type::I32 => Some(Value::I32(0)),
        Type::I64 => Some(Value::I64(0)),
        Type::F32 => Some(Value::F32(0.0)),
        Type::F64 => Some(Value::F64(0.0)),
        _ => None,
    }
}

/// Satisfies every import with an inert stand-in: functions return zeroes, memories are created
/// from their declared type. The engine needs none of its imports for normal play.
fn stub_imports(store: &mut Store, module: &Module) -> Result<(Imports, Option<Memory>)> {
    let mut imports = Imports::new();
    let mut imported_memory = None;
    for import in module.imports() {
        let (ns, name) = (import.module(), import.name());
        let ext = match import.ty() {
            ExternType::Function(ty) => {
                let result_types = ty.results().to_vec();
                let label = format!("{ns}.{name}");
                debug!(import = %label, "stubbing engine import");
                let func = Function::new(&mut *store, ty.clone(), move |_args| {
                    result_types
                        .iter()
                        .map(|t| {
                            zero_value(t).ok_or_else(|| {
                                RuntimeError::new(format!("{label}: unsupported result type"))
                            })
                        })
                        .collect()
                });
                Extern::Function(func)
            }
            ExternType::Memory(ty) => {
                let memory = Memory::new(&mut *store, *ty)
                    .with_context(|| format!("creating imported memory {ns}.{name}"))?;
                imported_memory = Some(memory.clone());
                Extern::Memory(memory)
            }
            other => bail!("unsupported engine import {ns}.{name}: {other:?}"),
        };
        imports.define(ns, name, ext);
    }
    Ok((imports, imported_memory))
}

impl LinearMemory for WasmRuleEngine {
    fn read_memory(&self, offset: u64, buf: &mut [u8]) -> Result<(), MemoryError> {
        self.memory
            .view(&self.store)
            .read(offset, buf)
            .map_err(|_| MemoryError::OutOfRange {
                offset,
                len: buf.len(),
            })
    }

    fn write_memory(&mut self, offset: u64, bytes: &[u8]) -> Result<(), MemoryError> {
        self.memory
            .view(&self.store)
            .write(offset, bytes)
            .map_err(|_| MemoryError::OutOfRange {
                offset,
                len: bytes.len(),
            })
    }
}

impl RuleEngine for WasmRuleEngine {
    fn init_game(&mut self, rows: i32, cols: i32, drop_limit: i32) -> bool {
        self.start(false, rows, cols, drop_limit)
    }

    fn reset_game(&mut self, rows: i32, cols: i32, drop_limit: i32) -> bool {
        self.start(true, rows, cols, drop_limit)
    }

    fn set_seed(&mut self, seed: u32) -> bool {
        let Some(f) = self.exports.set_seed.as_ref() else {
            return false;
        };
        match f.call(&mut self.store, seed as i32) {
            Ok(()) => true,
            Err(err) => trapped("wasm_set_seed", &err, false),
        }
    }

    fn tick(&mut self) {
        self.call0(Nullary::Tick);
    }

    fn move_left(&mut self) {
        self.call0(Nullary::MoveLeft);
    }

    fn move_right(&mut self) {
        self.call0(Nullary::MoveRight);
    }

    fn soft_drop(&mut self) {
        self.call0(Nullary::SoftDrop);
    }

    fn rotate_cw(&mut self) {
        self.call0(Nullary::RotateCw);
    }

    fn rotate_ccw(&mut self) {
        self.call0(Nullary::RotateCcw);
    }

    fn hard_drop(&mut self) {
        self.call0(Nullary::HardDrop);
    }

    fn is_game_over(&mut self) -> bool {
        self.call0(Nullary::IsGameOver) != 0
    }

    fn score(&mut self) -> i32 {
        self.call0(Nullary::Score)
    }

    fn lines(&mut self) -> i32 {
        self.call0(Nullary::Lines)
    }

    fn drop_cap(&mut self) -> i32 {
        self.call0(Nullary::DropCap)
    }

    fn drop_count(&mut self) -> i32 {
        self.call0(Nullary::DropCount)
    }

    fn board_ptr(&mut self) -> i32 {
        self.call0(Nullary::BoardPtr)
    }

    fn rows(&mut self) -> i32 {
        self.call0(Nullary::Rows)
    }

    fn cols(&mut self) -> i32 {
        self.call0(Nullary::Cols)
    }

    fn write_active_cells(&mut self, ptr: u32) {
        if let Err(err) = self
            .exports
            .write_active_cells
            .call(&mut self.store, ptr as i32)
        {
            trapped("wasm_write_active_cells", &err, ());
        }
    }

    fn active_color(&mut self) -> i32 {
        self.call0(Nullary::ActiveColor)
    }

    fn allocate(&mut self, bytes: u32) -> Option<u32> {
        let size = i32::try_from(bytes).ok()?;
        match self.exports.malloc.call(&mut self.store, size) {
            Ok(ptr) if ptr > 0 => Some(ptr as u32),
            Ok(_) => None,
            Err(err) => trapped("malloc", &err, None),
        }
    }
}
