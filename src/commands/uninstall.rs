use super::{Context, OpError};
use crate::compose::{compose_bin_path, remove_compose};
use crate::driver::DistroDriver;

pub fn run(ctx: &Context<'_>, driver: &dyn DistroDriver) -> Result<(), OpError> {
    ctx.output.begin("uninstall docker");
    driver.uninstall(ctx.runner)?;
    ctx.output.end("uninstall docker");

    ctx.output.begin("uninstall docker-compose");
    remove_compose(&compose_bin_path(driver.compose_dir()))?;
    ctx.output.end("uninstall docker-compose");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::Fixture;
    use crate::driver::{Apt, Driver, Upstart};
    use crate::exec::testing::RecordingRunner;
    use std::fs;

    fn apt_driver(fixture: &Fixture) -> Driver<Upstart, Apt> {
        Driver::new(
            "test-apt",
            Upstart {
                defaults_file: fixture.dir.path().join("default-docker"),
            },
            Apt {
                compose_dir: fixture.dir.path().join("bin"),
            },
        )
    }

    #[test]
    fn test_uninstall_removes_engine_and_compose() {
        let fixture = Fixture::new();
        let driver = apt_driver(&fixture);
        fs::create_dir_all(driver.compose_dir()).unwrap();
        let bin = compose_bin_path(driver.compose_dir());
        fs::write(&bin, "binary").unwrap();

        let runner = RecordingRunner::default();
        run(&fixture.context(&runner), &driver).unwrap();

        assert_eq!(
            runner.commands(),
            vec!["apt-get -qqy purge docker-engine", "apt-get -qqy autoremove"]
        );
        assert!(!bin.exists());
    }

    #[test]
    fn test_engine_failure_keeps_compose() {
        let fixture = Fixture::new();
        let driver = apt_driver(&fixture);
        fs::create_dir_all(driver.compose_dir()).unwrap();
        let bin = compose_bin_path(driver.compose_dir());
        fs::write(&bin, "binary").unwrap();

        let runner = RecordingRunner::failing_on(&["apt-get -qqy purge"]);
        assert!(run(&fixture.context(&runner), &driver).is_err());
        assert!(bin.exists());
    }
}
