//! Draining the delegation request queue into stack mutations.

use tracing::warn;

use bhv_behavior::{BehaviorContainer, BehaviorServices, DelegationRequest};
use bhv_core::{verify, BehaviorId};

use crate::BehaviorStack;

/// Upper bound on requests applied in one drain; activation hooks may queue more.
const MAX_REQUESTS_PER_DRAIN: usize = 1000;

impl BehaviorStack {
    /// Apply every queued [`DelegationRequest`] in order.
    ///
    /// Requests queued by the hooks these mutations trigger (activation of a
    /// pushed delegate, for instance) are applied in the same drain.
    pub fn apply_delegation_requests(
        &mut self,
        container: &mut BehaviorContainer,
        services:  &mut BehaviorServices,
    ) {
        let mut applied = 0;
        while let Some(request) = services.delegation.pop_request() {
            if applied == MAX_REQUESTS_PER_DRAIN {
                warn!(
                    dropped = 1 + usize::from(services.delegation.has_pending_requests()),
                    "BehaviorStack.ApplyDelegationRequests.RequestBudgetExhausted"
                );
                services.delegation.clear_requests();
                break;
            }
            applied += 1;

            match request {
                DelegationRequest::PushBehavior { delegator, delegate } => {
                    self.apply_push(delegator, delegate, container, services);
                }
                DelegationRequest::PopAbove { behavior } => {
                    if !self.contains(behavior) {
                        continue;
                    }
                    // Any record held now was made after the cancel and survives the pops.
                    let redelegation = services.delegation.remove_record(behavior);
                    while self.top().is_some_and(|top| top != behavior) {
                        self.pop_stack(container, services);
                    }
                    if let Some(record) = redelegation {
                        services.delegation.insert_record(behavior, record);
                    }
                }
                DelegationRequest::PopSelf { behavior } => {
                    if !self.contains(behavior) {
                        continue;
                    }
                    while self.contains(behavior) {
                        self.pop_stack(container, services);
                    }
                }
            }
        }
    }

    fn apply_push(
        &mut self,
        delegator: BehaviorId,
        delegate:  BehaviorId,
        container: &mut BehaviorContainer,
        services:  &mut BehaviorServices,
    ) {
        let on_top = self.top() == Some(delegator);
        let pushed = verify!(
            on_top,
            "BehaviorStack.ApplyDelegationRequests.DelegatorNotOnTop",
            "{} delegated to {} but is not the top of the stack",
            container.label(delegator),
            container.label(delegate)
        ) && self.push_onto_stack(delegate, container, services);

        if !pushed && services.delegation.delegated_behavior(delegator) == Some(delegate) {
            services.delegation.remove_record(delegator);
        }
    }
}
