use crate::app::App;
use crate::Cli;
use anyhow::Result;

pub async fn run(cli: &Cli) -> Result<()> {
    let app = App::new(cli)?;

    eprintln!("Testing {} connectivity...", app.vault.name());
    match app.vault.verify().await {
        Ok(identity) => {
            eprintln!("OK: {}", identity);
            Ok(())
        }
        Err(e) => {
            anyhow::bail!("{} connectivity test failed: {}", app.vault.name(), e)
        }
    }
}
