use futures::future::BoxFuture;

use crate::{CommandSpec, StepBody, StepContext};

/// Installs a command-line tool when `<bin> --version` fails.
#[derive(Debug, Clone)]
pub struct CheckBinary {
    bin: String,
    install: CommandSpec,
}

impl CheckBinary {
    pub fn new(bin: impl Into<String>, install: &str) -> Self {
        Self {
            bin: bin.into(),
            install: CommandSpec::parse(install),
        }
    }

    async fn check(&self, ctx: &StepContext<'_>) -> anyhow::Result<()> {
        println!("Checking if {} is installed", self.bin);

        let version_check = CommandSpec::new(&self.bin).arg("--version").silent();
        match ctx.run(&version_check).await {
            Ok(_) => {
                println!("{} found, skipping install", self.bin);
            }
            Err(e) => {
                tracing::debug!(bin = %self.bin, error = %e, "Version check failed");
                println!("{} not found, installing with \"{}\"", self.bin, self.install);
                ctx.run(&self.install).await?;
            }
        }
        Ok(())
    }
}

impl StepBody for CheckBinary {
    fn execute<'a>(&'a self, ctx: &'a StepContext<'a>) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(self.check(ctx))
    }
}
