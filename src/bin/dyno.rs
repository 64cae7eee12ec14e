//! Headless full-throttle run of one vehicle profile on the arcade rig.
//! Prints a JSON summary (0-100 time, top speed, shifts, spoiler timing).

use std::{env, fs, path::PathBuf, process, sync::Arc};

use nalgebra::Point3;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use soulvan_sim::error::{SimError, SimResult};
use soulvan_sim::vehicle::aero::SpoilerChange;
use soulvan_sim::vehicle::arcade::ArcadeRig;
use soulvan_sim::vehicle::{ControlInput, VehicleProfile, VehicleSimulator};

const DT: f32 = 1.0 / 120.0;

#[derive(Debug)]
struct Cli {
    profile: Arc<VehicleProfile>,
    seconds: f32,
    nitro: bool,
    json_out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct DynoReport {
    profile: String,
    seconds: f32,
    nitro: bool,
    zero_to_100_s: Option<f32>,
    top_speed_kmh: f32,
    upshifts: usize,
    downshifts: usize,
    final_gear: usize,
    spoiler_deployed_at_s: Option<f32>,
    final_engine_heat: f32,
    final_damage: f32,
    final_tire_wear: f32,
}

impl Cli {
    fn parse() -> SimResult<Self> {
        let mut args = env::args().skip(1);
        let mut profile = Arc::new(VehicleProfile::street_racer());
        let mut seconds = 30.0;
        let mut nitro = false;
        let mut json_out = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--preset" => {
                    let value = next_value(&mut args, "--preset")?;
                    profile = Arc::new(match value.as_str() {
                        "street_racer" => VehicleProfile::street_racer(),
                        "heist_van" => VehicleProfile::heist_van(),
                        "interceptor" => VehicleProfile::interceptor(),
                        other => return Err(SimError::InvalidArgument(format!("unknown preset: {other}"))),
                    });
                }
                "--profile" => {
                    let value = next_value(&mut args, "--profile")?;
                    profile = Arc::new(VehicleProfile::from_json_file(value)?);
                }
                "--seconds" => {
                    let value = next_value(&mut args, "--seconds")?;
                    seconds = value
                        .parse::<f32>()
                        .ok()
                        .filter(|s| s.is_finite() && *s > 0.0)
                        .ok_or_else(|| SimError::InvalidArgument(format!("invalid --seconds value: {value}")))?;
                }
                "--nitro" => nitro = true,
                "--json-out" => json_out = Some(PathBuf::from(next_value(&mut args, "--json-out")?)),
                "-h" | "--help" => {
                    println!(
                        "Usage: soulvan-dyno [--preset street_racer|heist_van|interceptor] [--profile <file.json>] [--seconds <s>] [--nitro] [--json-out <file.json>]"
                    );
                    process::exit(0);
                }
                other => {
                    return Err(SimError::InvalidArgument(format!("unknown argument: {other}. Use --help for usage.")));
                }
            }
        }

        Ok(Self { profile, seconds, nitro, json_out })
    }
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> SimResult<String> {
    args.next()
        .ok_or_else(|| SimError::InvalidArgument(format!("{flag} requires a value")))
}

fn run(cli: &Cli) -> DynoReport {
    let mut sim = VehicleSimulator::new(Arc::clone(&cli.profile));
    let mut rig = ArcadeRig::new(&sim, Point3::origin(), 0.0);
    sim.apply_input(ControlInput::new(1.0, 0.0, 0.0, cli.nitro));

    let mut report = DynoReport {
        profile: cli.profile.name.clone(),
        seconds: cli.seconds,
        nitro: cli.nitro,
        zero_to_100_s: None,
        top_speed_kmh: 0.0,
        upshifts: 0,
        downshifts: 0,
        final_gear: 0,
        spoiler_deployed_at_s: None,
        final_engine_heat: 0.0,
        final_damage: 0.0,
        final_tire_wear: 1.0,
    };

    let ticks = (cli.seconds / DT).ceil() as usize;
    for i in 1..=ticks {
        let tick = rig.step(&mut sim, DT);
        let t = i as f32 * DT;

        if let Some(shift) = tick.shift {
            if shift.is_upshift() {
                report.upshifts += 1;
            } else {
                report.downshifts += 1;
            }
        }
        if tick.spoiler == Some(SpoilerChange::Deployed) && report.spoiler_deployed_at_s.is_none() {
            report.spoiler_deployed_at_s = Some(t);
        }
        if report.zero_to_100_s.is_none() && sim.speed() >= 100.0 {
            report.zero_to_100_s = Some(t);
        }
        report.top_speed_kmh = report.top_speed_kmh.max(sim.speed());
    }

    report.final_gear = sim.gear();
    report.final_engine_heat = sim.engine_heat();
    report.final_damage = sim.structural_damage();
    report.final_tire_wear = sim.average_tire_wear();
    report
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    if let Err(e) = try_main() {
        eprintln!("error: {e}");
        process::exit(2);
    }
}

fn try_main() -> SimResult<()> {
    let cli = Cli::parse()?;
    tracing::info!(profile = %cli.profile.name, seconds = cli.seconds, "dyno run");

    let report = run(&cli);
    let json = serde_json::to_string_pretty(&report)?;
    println!("{json}");

    if let Some(path) = &cli.json_out {
        fs::write(path, json)?;
    }
    Ok(())
}
