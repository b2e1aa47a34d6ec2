pub fn print_ready() {
    println!("readyok");
}
