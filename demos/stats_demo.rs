use clap::Parser;
use clap::ValueEnum;
use probe_table::HashTable;
use probe_table::hasher::Fnv1aBuildHasher;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Workload {
    /// Insert keys only.
    Fill,
    /// Insert every key, then remove every other one.
    Churn,
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "initial_capacity", default_value_t = 64)]
    initial_capacity: usize,

    #[arg(short = 'n', long = "entries", default_value_t = 1000)]
    entries: usize,

    #[arg(short = 'w', long = "workload", value_enum, default_value_t = Workload::Fill)]
    workload: Workload,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    println!(
        "Creating HashTable with initial capacity: {}",
        args.initial_capacity
    );

    let mut table: HashTable<String, u64, _> =
        HashTable::with_capacity_and_hasher(args.initial_capacity, Fnv1aBuildHasher);

    println!("Inserting {} string keys...", args.entries);
    for i in 0..args.entries {
        table.insert(format!("key_{i:08}"), i as u64);
    }

    if let Workload::Churn = args.workload {
        let mut removed = 0;
        for i in (0..args.entries).step_by(2) {
            if table.remove(format!("key_{i:08}").as_str()) {
                removed += 1;
            }
        }
        println!("Removed {removed} entries");
    }

    println!(
        "Final: {} entries in {} slots ({:.2}% load factor)",
        table.len(),
        table.capacity(),
        (table.len() as f64 / table.capacity() as f64) * 100.0
    );

    table.probe_histogram().print();
    table.debug_stats().print();
}
