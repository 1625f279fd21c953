use std::thread;

use anyhow::anyhow;
use clap::Parser;
use log::info;

use shared_handle::SharedPtr;

/// Demonstrates shared ownership of polymorphic objects and sharing one object across threads.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Number of copies each worker thread keeps
    #[arg(long, default_value_t = 1000)]
    copies : usize,

    /// Number of worker threads
    #[arg(long, default_value_t = 2)]
    threads : usize,
}

trait Report {
    fn report(&self) -> String;
}

struct Foo;

impl Report for Foo {
    fn report(&self) -> String {
        "I am Foo and I am fine!".to_string()
    }
}

impl Drop for Foo {
    fn drop(&mut self) {
        info!("Foo dropped");
    }
}

struct Bear;

impl Report for Bear {
    fn report(&self) -> String {
        "I am Bear and I am fine!".to_string()
    }
}

impl Drop for Bear {
    fn drop(&mut self) {
        info!("Bear dropped");
    }
}

fn polymorphic_objects() {
    let objects : Vec<SharedPtr<dyn Report>> = vec![
        SharedPtr::<dyn Report>::from_box(Box::new(Foo)),
        SharedPtr::<dyn Report>::from_box(Box::new(Bear)),
    ];

    // An extra owner keeps Foo alive after the vector is gone.
    let survivor = objects[0].clone();

    for obj in &objects {
        println!("{}", obj.report());
    }

    drop(objects);
    println!("{} (owners: {})", survivor.report(), survivor.use_count());
}

fn share_across_threads(threads : usize, copies : usize) -> anyhow::Result<()> {
    let root = SharedPtr::new(Bear);

    let held = thread::scope(|s| {
        let workers : Vec<_> = (0..threads).map(|_| {
            let root = &root;
            s.spawn(move || {
                let mut local = Vec::with_capacity(copies);
                while local.len() < copies {
                    local.push(root.clone());
                }
                local
            })
        }).collect();

        workers.into_iter()
            .map(|w| w.join().map_err(|_| anyhow!("worker thread panicked")))
            .collect::<anyhow::Result<Vec<_>>>()
    })?;

    info!("{} threads joined, owners: {}", threads, root.use_count());
    println!("owners with all copies alive: {}", root.use_count());

    for (i, local) in held.into_iter().enumerate() {
        drop(local);
        println!("owners after releasing worker {}: {}", i, root.use_count());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    polymorphic_objects();
    share_across_threads(cli.threads, cli.copies)?;
    Ok(())
}
