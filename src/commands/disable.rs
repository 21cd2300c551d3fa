use super::{Context, OpError};
use crate::driver::DistroDriver;

pub fn run(ctx: &Context<'_>, driver: &dyn DistroDriver) -> Result<(), OpError> {
    ctx.output.begin("stop docker daemon");
    driver.stop(ctx.runner)?;
    ctx.output.end("stop docker daemon");
    Ok(())
}
