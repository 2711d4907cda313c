use linky::{Credentials, Linky};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let credentials = Credentials::from_env()?;
    println!("credentials: {:?}", credentials);

    let session = Linky::new().login(&credentials)?;

    let prefix: String = session.token().chars().take(6).collect();
    println!("token: {}...", prefix);
    Ok(())
}
