//! selfsigned-ca utility - main entrypoint
// (c) 2024 Ross Younger

fn main() -> anyhow::Result<std::process::ExitCode> {
    selfsigned_ca::cli()
}
