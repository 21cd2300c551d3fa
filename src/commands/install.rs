use super::{Context, OpError};
use crate::driver::DistroDriver;

const OPERATION: &str = "install";

/// Installation is deferred to enable, which the agent runs with a longer timeout
pub fn run(ctx: &Context<'_>, _driver: &dyn DistroDriver) -> Result<(), OpError> {
    ctx.output.info(
        OPERATION,
        "installing is deferred to the enable step to avoid timeouts.",
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::Fixture;
    use crate::driver;
    use crate::exec::testing::RecordingRunner;

    #[test]
    fn test_install_runs_nothing() {
        let fixture = Fixture::new();
        let runner = RecordingRunner::default();
        run(&fixture.context(&runner), &driver::ubuntu_systemd()).unwrap();
        assert!(runner.commands().is_empty());
        assert!(fixture.log().contains("deferred to the enable step"));
    }
}
