//! Print the PHC string for a password, for `[[directory.users]]` entries.
//!
//! $ cargo run --bin hash-password -- 'correct horse battery staple'

use clap::Parser;
use sessiond::application_impl::Argon2PasswordHasher;
use sessiond::application_port::CredentialHasher;

#[derive(Parser, Debug)]
struct Args {
    password: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let hash = Argon2PasswordHasher.hash_password(&args.password).await?;
    println!("{}", hash);
    Ok(())
}
