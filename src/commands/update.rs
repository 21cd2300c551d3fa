use super::{Context, OpError};
use crate::driver::DistroDriver;

const OPERATION: &str = "update";

/// New settings take effect when the agent calls enable for them
pub fn run(ctx: &Context<'_>, _driver: &dyn DistroDriver) -> Result<(), OpError> {
    ctx.output
        .info(OPERATION, "nothing to do, changes are applied by enable");
    Ok(())
}
