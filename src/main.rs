use std::error::Error as StdError;
use std::io::{BufRead, Write};
use std::time::Duration;

use clap::{Parser, Subcommand};
use extendible_buckets::{
    logging, parse_capacity, parse_key, DeleteOutcome, Error, HashTable, InsertOutcome, Location,
    SearchOutcome, TableConfig,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Times insert, search and delete over random keys.
    Bench {
        #[clap(short = 'c', long, default_value = "4")]
        capacity: usize,
        #[clap(short = 'n', long, default_value = "100000")]
        samples: usize,
        #[clap(short = 'd', long, default_value = "20")]
        max_depth: u32,
        #[clap(short = 's', long)]
        seed: Option<u64>,
    },
    /// Reads `init`, `insert`, `search`, `delete`, `show` and `check`
    /// commands from stdin, one per line.
    Run {
        #[clap(short = 'c', long, default_value = "2")]
        capacity: usize,
        #[clap(short = 'd', long, default_value = "20")]
        max_depth: u32,
    },
}

fn main() -> Result<(), Box<dyn StdError>> {
    let args = Args::parse();

    logging::setup();

    match args.command {
        Command::Bench {
            capacity,
            samples,
            max_depth,
            seed,
        } => bench(
            TableConfig::with_capacity(capacity).max_global_depth(max_depth),
            samples,
            seed,
        ),
        Command::Run {
            capacity,
            max_depth,
        } => {
            let mut table: HashTable =
                HashTable::with_config(TableConfig::with_capacity(capacity).max_global_depth(max_depth))?;
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            run_session(&mut table, stdin.lock(), stdout.lock())
        }
    }
}

fn bench(config: TableConfig, sample_size: usize, seed: Option<u64>) -> Result<(), Box<dyn StdError>> {
    config.validate()?;

    let mut rng: StdRng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let samples: Vec<i64> = (0..sample_size).map(|_| rng.gen::<i64>()).collect();

    let fill = |table: &mut HashTable| {
        let mut rejected: usize = 0;
        for &key in &samples {
            if table.insert(key).is_err() {
                rejected += 1;
            }
        }
        rejected
    };

    let mut table: HashTable = HashTable::with_config(config)?;
    let rejected: usize = fill(&mut table);
    if rejected > 0 {
        log::warn!("{rejected} keys did not fit under the depth limit and were skipped");
    }
    for &key in &samples {
        if let SearchOutcome::NotFound(bucket) = table.search(key)? {
            if !matches!(
                table.insert(key),
                Err(Error::DepthExhaustion { .. } | Error::DirectoryAllocation { .. })
            ) {
                return Err(format!("lost key {key}, expected in bucket {bucket}").into());
            }
        }
    }
    table.check_invariants()?;

    println!("Bucket capacity {} samples {}", config.bucket_capacity, sample_size);
    println!(
        "Global depth {} directory slots {} buckets {}",
        table.global_depth(),
        table.directory_len(),
        table.bucket_count()
    );
    println!("Stored keys {} load factor {:.3}", table.count(), table.load_factor());

    benchmarking::warm_up();

    let insert = benchmarking::measure_function(|measurer| {
        let Ok(mut table) = HashTable::with_config(config) else {
            return;
        };
        measurer.measure(|| fill(&mut table));
    })
    .map_err(|err| format!("{err:?}"))?;

    let search = benchmarking::measure_function(|measurer| {
        measurer.measure(|| {
            for &key in &samples {
                let _ = table.search(key);
            }
        });
    })
    .map_err(|err| format!("{err:?}"))?;

    let delete = benchmarking::measure_function(|measurer| {
        let Ok(mut table) = HashTable::with_config(config) else {
            return;
        };
        fill(&mut table);
        measurer.measure(|| {
            for &key in &samples {
                let _ = table.delete(key);
            }
        });
    })
    .map_err(|err| format!("{err:?}"))?;

    let per_key = |elapsed: Duration| elapsed.as_nanos() as f64 / sample_size.max(1) as f64;
    println!("Avg time to insert {:.1}ns", per_key(insert.elapsed()));
    println!("Avg time to search {:.1}ns", per_key(search.elapsed()));
    println!("Avg time to delete {:.1}ns", per_key(delete.elapsed()));
    Ok(())
}

/// Executes one command per input line and writes a status line for each.
///
/// Input and capacity errors, as well as depth exhaustion, are reported and
/// the session goes on; an internal inconsistency ends it.
fn run_session<R, W>(table: &mut HashTable, input: R, mut output: W) -> Result<(), Box<dyn StdError>>
where
    R: BufRead,
    W: Write,
{
    for line in input.lines() {
        let line: String = line?;
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        if command.starts_with('#') {
            continue;
        }
        let argument: &str = words.next().unwrap_or("");

        match execute(table, command, argument) {
            Ok(message) => writeln!(output, "{message}")?,
            Err(err @ Error::InternalInconsistency(_)) => {
                log::error!("{err}");
                return Err(err.into());
            }
            Err(err) => writeln!(output, "error: {err}")?,
        }
    }
    Ok(())
}

fn execute(table: &mut HashTable, command: &str, argument: &str) -> Result<String, Error> {
    let message: String = match command {
        "init" => {
            let capacity: usize = parse_capacity(argument)?;
            table.initialize(capacity)?;
            format!("initialized with bucket capacity {capacity}, global depth 0")
        }
        "insert" => {
            let key: i64 = parse_key(argument)?;
            let buckets_before: usize = table.bucket_count();
            match table.insert(key)? {
                InsertOutcome::Inserted(bucket) if table.bucket_count() > buckets_before => format!(
                    "key {key} inserted into bucket {bucket} after {} split(s), global depth {}",
                    table.bucket_count() - buckets_before,
                    table.global_depth()
                ),
                InsertOutcome::Inserted(bucket) => format!("key {key} inserted into bucket {bucket}"),
                InsertOutcome::AlreadyPresent(bucket) => {
                    format!("key {key} already present in bucket {bucket}")
                }
            }
        }
        "search" => {
            let key: i64 = parse_key(argument)?;
            let Location { index, .. } = table.locate(key)?;
            match table.search(key)? {
                SearchOutcome::Found(bucket) => {
                    format!("key {key} found in bucket {bucket} (slot {index})")
                }
                SearchOutcome::NotFound(bucket) => {
                    format!("key {key} not found in bucket {bucket} (slot {index})")
                }
            }
        }
        "delete" => {
            let key: i64 = parse_key(argument)?;
            match table.delete(key)? {
                DeleteOutcome::Deleted(bucket) => format!("key {key} deleted from bucket {bucket}"),
                DeleteOutcome::NotFound(bucket) => {
                    format!("key {key} not found in bucket {bucket}")
                }
            }
        }
        "show" => table.snapshot().to_string().trim_end().to_owned(),
        "check" => {
            table.check_invariants()?;
            "ok".to_owned()
        }
        other => format!("unknown command {other:?}"),
    };
    Ok(message)
}
