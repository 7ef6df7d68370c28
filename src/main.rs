use clap::Parser;
use coil_planner::config::{DEFAULT_COILS, MAX_TABLE_LENGTH, Profile, SolverConfig};
use coil_planner::scrap::suggest_scrap_alternatives;
use coil_planner::solver::Solver;
use coil_planner::types::{CoilSpec, Part, Plan};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "coil_planner",
    about = "Plans coil cutting tables with minimal waste"
)]
struct Cli {
    /// Enabled coil widths in cm (e.g. 125,100,50,33.3,25). Defaults to the standard catalog
    #[arg(long, value_delimiter = ',')]
    coils: Vec<f64>,

    /// Parts as WIDTHxLENGTH:qty, width in cm and length in m (e.g. 25x3:1 40x2.5:4)
    #[arg(long = "part", num_args = 1.., required = true)]
    parts: Vec<String>,

    /// Scoring profile: min-waste, balanced, or fewer-tables
    #[arg(long, default_value = "balanced")]
    profile: Profile,

    /// Also suggest taking short parts from scrap
    #[arg(long)]
    scrap: bool,

    /// Print the plan as JSON
    #[arg(long)]
    json: bool,

    /// Log solver decisions to stderr
    #[arg(long)]
    verbose: bool,
}

fn parse_number(s: &str, what: &str, input: &str) -> Result<f64, String> {
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("invalid {} in '{}'", what, input))?;
    if !v.is_finite() || v <= 0.0 {
        return Err(format!("{} must be positive in '{}'", what, input));
    }
    Ok(v)
}

fn parse_part(id: usize, s: &str) -> Result<Part, String> {
    let (dims, qty) = s
        .split_once(':')
        .ok_or_else(|| format!("invalid part '{}', expected WIDTHxLENGTH:qty", s))?;
    let (width, length) = dims
        .split_once('x')
        .ok_or_else(|| format!("invalid dimensions in '{}', expected WIDTHxLENGTH", s))?;
    let width = parse_number(width, "width", s)?;
    let length = parse_number(length, "length", s)?;
    if length > MAX_TABLE_LENGTH {
        return Err(format!(
            "length must not exceed {}m in '{}'",
            MAX_TABLE_LENGTH, s
        ));
    }
    let quantity = qty
        .parse::<u32>()
        .map_err(|_| format!("quantity must be a whole number in '{}'", s))?;
    if quantity == 0 {
        return Err(format!("quantity must be non-zero in '{}'", s));
    }
    Ok(Part::new(id, width, length, quantity))
}

fn print_plan(plan: &Plan, parts: &[Part]) {
    for coil in plan.coils.iter().filter(|c| !c.tables.is_empty()) {
        println!("Coil {} cm:", coil.coil_width);
        for (i, t) in coil.tables.iter().enumerate() {
            println!(
                "  Table {}: length {:.2} m, used width {:.1} cm, {} piece{}",
                i + 1,
                t.length,
                t.used_width(),
                t.produced_pieces(),
                if t.produced_pieces() == 1 { "" } else { "s" },
            );
            for lane in &t.lanes {
                let cuts: Vec<String> = lane
                    .cuts
                    .iter()
                    .map(|c| {
                        let tag = if c.from_remnant { "*" } else { "" };
                        format!("{:.2}m{}", c.length, tag)
                    })
                    .collect();
                if cuts.is_empty() {
                    println!("    {:.1}cm (empty)", lane.width);
                } else {
                    println!("    {:.1}cm ({})", lane.width, cuts.join("+"));
                }
            }
            let waste: Vec<String> = t
                .waste_rects()
                .iter()
                .map(|w| format!("{:.2}m x {:.1}cm", w.length, w.width))
                .collect();
            if waste.is_empty() {
                println!("    no waste");
            } else {
                println!("    waste: {}", waste.join(", "));
            }
        }
    }

    let required: f64 = parts.iter().map(|p| p.quantity as f64 * p.length).sum();
    println!();
    println!(
        "Summary: {} table{}, required {:.3} m, used {:.3} m, waste {:.3} m² ({:.1}%)",
        plan.table_count(),
        if plan.table_count() == 1 { "" } else { "s" },
        required,
        plan.used_length,
        plan.total_waste,
        plan.waste_percent(),
    );
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let coils: Vec<CoilSpec> = if cli.coils.is_empty() {
        DEFAULT_COILS.to_vec()
    } else {
        cli.coils.iter().map(|&w| CoilSpec::new(w)).collect()
    };

    let parts: Vec<Part> = cli
        .parts
        .iter()
        .enumerate()
        .map(|(i, s)| parse_part(i, s))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });

    let config = SolverConfig::with_profile(cli.profile);
    let plan = Solver::new(parts.clone(), &coils, config.clone())
        .solve()
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });

    let suggestions = if cli.scrap {
        suggest_scrap_alternatives(&plan, &parts, &coils, &config)
    } else {
        Vec::new()
    };

    if cli.json {
        let out = serde_json::json!({ "plan": plan, "scrap_suggestions": suggestions });
        match serde_json::to_string_pretty(&out) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    print_plan(&plan, &parts);
    for s in &suggestions {
        println!(
            "Scrap: one {}cm x {}m piece of part {} from offcuts saves {:.3} m² ({:?})",
            s.width, s.length, s.part_id, s.saving, s.availability
        );
    }
}
