use super::pickers::print_json;
use super::{DataArgs, init_manager};

pub fn run_reconcile(data: DataArgs, dry_run: bool) -> anyhow::Result<()> {
    let manager = init_manager(&data)?;
    let reconciler = manager.reconciler();

    if dry_run {
        return print_json(&reconciler.pending()?);
    }

    let report = reconciler.run()?;
    print_json(&report)?;
    if !report.errors.is_empty() {
        anyhow::bail!("{} intent(s) could not be reconciled", report.errors.len());
    }
    Ok(())
}
