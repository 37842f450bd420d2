//! A small driver binary for `picovm-core`: parses a handful of CLI
//! flags with `lexopt` (ported from the teacher's `examples/dis.rs`
//! usage pattern, trimmed to this CORE's needs since there is no
//! compiler front-end to hand source files to — SPEC_FULL "Settings &
//! CLI"), builds a `Vm`, and runs the hand-assembled demo code objects
//! in [`scenarios`].

mod scenarios;

use lexopt::prelude::*;
use picovm_core::{Settings, Vm};

struct Args {
    recursion_limit: usize,
    debug: bool,
    scenario: Option<String>,
}

fn parse_args() -> Result<Args, lexopt::Error> {
    let mut recursion_limit = Settings::default().recursion_limit;
    let mut debug = false;
    let mut scenario = None;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Long("help") | Short('h') => {
                let bin_name = parser.bin_name().unwrap_or("picovm");
                println!(
                    "usage: {bin_name} [-r,--recursion-limit=N] [-d,--debug] [SCENARIO]"
                );
                println!(
                    "Runs hand-assembled demo code objects through the picovm-core interpreter."
                );
                std::process::exit(0);
            }
            Long("recursion-limit") | Short('r') => {
                recursion_limit = parser
                    .value()?
                    .parse_with(|s| s.parse::<usize>().map_err(|e| e.to_string()))?;
            }
            Long("debug") | Short('d') => debug = true,
            Value(v) => scenario = Some(v.string()?),
            _ => return Err(arg.unexpected()),
        }
    }

    Ok(Args {
        recursion_limit,
        debug,
        scenario,
    })
}

fn run_one(name: &str, vm: &Vm) {
    let outcome = match name {
        "int-compute" => scenarios::int_compute(vm).map(|(a, b)| format!("f(3,3)={a:?}, f(6,7)={b:?}")),
        "inplace-fallback" => scenarios::inplace_fallback(vm).map(|v| format!("{v:?}")),
        "extended-oparg" => scenarios::extended_oparg(vm).map(|v| format!("{v:?}")),
        "recursion-limit" => scenarios::recursion_limit(vm).map(|v| format!("{v:?}")),
        other => {
            eprintln!("unknown scenario '{other}'");
            return;
        }
    };
    match outcome {
        Ok(desc) => println!("{name}: {desc}"),
        Err(err) => println!("{name}: raised {err}"),
    }
}

fn main() -> Result<(), lexopt::Error> {
    env_logger::init();
    let args = parse_args()?;

    let settings = Settings {
        recursion_limit: args.recursion_limit,
        debug: args.debug,
    };
    let vm = Vm::with_settings(settings);

    const ALL: &[&str] = &[
        "int-compute",
        "inplace-fallback",
        "extended-oparg",
        "recursion-limit",
    ];
    match args.scenario.as_deref() {
        Some(name) => run_one(name, &vm),
        None => {
            for name in ALL {
                run_one(name, &vm);
            }
        }
    }

    Ok(())
}
