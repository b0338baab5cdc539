//! CLI binary entry point. Grounded on the teacher's `src/bin`/`cli::run`
//! split: the binary crate is a one-line shim, all behavior lives in
//! `modl::cli` so it stays testable without a process boundary.

fn main() {
    modl::cli::run();
}
