//! Status propagation between nested balancers.

use std::sync::Weak;

use crate::load_balancer::{Balancer, BalancerResult};

/// Report `child`'s aggregate status to `parent` as the status of `name`.
///
/// The parent is held weakly so the two balancers don't keep each other
/// alive. Must be called before `child` is shared.
pub fn propagate_to(child: &mut Balancer, parent: Weak<Balancer>, name: impl Into<String>) -> BalancerResult<()> {
    let name = name.into();
    child.register_status_updater(move |up| {
        if let Some(parent) = parent.upgrade() {
            parent.set_status(&name, up);
        }
    })
}
