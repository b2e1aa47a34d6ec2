use std::time::Duration;

pub fn print_perft_info(depth: usize, nodes: u64, elapsed: Duration) {
    println!(
        "info string perft depth {} nodes {} time {:?}",
        depth, nodes, elapsed
    );
}
