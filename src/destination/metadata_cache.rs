//! Metadata-cache backed destination group.
//!
//! # Responsibilities
//! - Subscribe to topology changes of one replicaset
//! - Keep the last accepted snapshot and the nodes eligible for new
//!   connections under the registry lock
//! - Order candidates per connection according to the routing strategy
//! - Raise invalidation signals on promotion, removal and provider loss
//!
//! # Lifecycle
//! ```text
//! Unsubscribed --start()--> Subscribed --stop()/drop--> Stopped
//!                            ^      |
//!                            +------+ notify(): snapshot replaced in place
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::destination::balance;
use crate::destination::registry::RegistryState;
use crate::destination::{
    AvailableDestination, ConnectionInvalidator, DestinationRegistry, Destinations,
    InvalidationEvent, InvalidationReason, RouteDestination,
};
use crate::metadata::instance::find_duplicate_id;
use crate::metadata::{
    ListenerId, ManagedInstance, MetadataCacheApi, ReplicasetStateListener, TcpAddress,
};
use crate::observability::metrics;
use crate::routing::{
    AccessMode, GroupPolicy, RouteOptions, RoutingError, RoutingStrategy, ServerRole,
};

/// Construction parameters of a metadata-cache destination group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationSpec {
    /// Route name, used in logs, metrics and invalidation events.
    pub name: String,
    /// Metadata cache section the group reads from.
    pub cache_name: String,
    /// Replicaset whose members are routed to.
    pub replicaset: String,
    pub routing_strategy: RoutingStrategy,
    pub access_mode: AccessMode,
    /// Free-form options (`role`, `allow_primary_reads`, ...).
    pub options: BTreeMap<String, String>,
}

impl DestinationSpec {
    pub fn new(
        name: impl Into<String>,
        cache_name: impl Into<String>,
        replicaset: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            cache_name: cache_name.into(),
            replicaset: replicaset.into(),
            routing_strategy: RoutingStrategy::Undefined,
            access_mode: AccessMode::Undefined,
            options: BTreeMap::new(),
        }
    }

    pub fn with_strategy(mut self, strategy: RoutingStrategy) -> Self {
        self.routing_strategy = strategy;
        self
    }

    pub fn with_access_mode(mut self, access_mode: AccessMode) -> Self {
        self.access_mode = access_mode;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Validate options and resolve the effective policy.
    pub fn policy(&self) -> Result<GroupPolicy, RoutingError> {
        let options = RouteOptions::from_query(&self.options)?;
        GroupPolicy::resolve(self.routing_strategy, self.access_mode, &options)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subscription {
    Unsubscribed,
    Subscribed(ListenerId),
    Stopped,
}

/// Destination group routing to the members of a replicaset as reported by
/// the metadata cache.
pub struct MetadataCacheDestination {
    name: String,
    cache_name: String,
    replicaset: String,
    policy: GroupPolicy,
    cache_api: Arc<dyn MetadataCacheApi>,
    invalidator: Arc<dyn ConnectionInvalidator>,
    registry: DestinationRegistry,
    subscription: Mutex<Subscription>,
    me: Weak<MetadataCacheDestination>,
}

/// Registered with the provider; holds the group weakly so that dropping
/// the group is not prevented by the provider's listener list.
struct GroupListener {
    group: Weak<MetadataCacheDestination>,
}

impl ReplicasetStateListener for GroupListener {
    fn notify(&self, instances: &[ManagedInstance], md_servers_reachable: bool, view_id: u64) {
        if let Some(group) = self.group.upgrade() {
            group.notify(instances, md_servers_reachable, view_id);
        }
    }
}

impl MetadataCacheDestination {
    /// Build a group. Misconfiguration is reported here and the group is
    /// never created.
    pub fn new(
        spec: DestinationSpec,
        cache_api: Arc<dyn MetadataCacheApi>,
        invalidator: Arc<dyn ConnectionInvalidator>,
    ) -> Result<Arc<Self>, RoutingError> {
        let policy = spec.policy()?;

        tracing::info!(
            group = %spec.name,
            metadata_cache = %spec.cache_name,
            replicaset = %spec.replicaset,
            role = %policy.server_role,
            strategy = %policy.routing_strategy,
            access_mode = %policy.access_mode,
            "Destination group created"
        );

        Ok(Arc::new_cyclic(|me| Self {
            name: spec.name,
            cache_name: spec.cache_name,
            replicaset: spec.replicaset,
            policy,
            cache_api,
            invalidator,
            registry: DestinationRegistry::new(),
            subscription: Mutex::new(Subscription::Unsubscribed),
            me: me.clone(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn replicaset(&self) -> &str {
        &self.replicaset
    }

    pub fn server_role(&self) -> ServerRole {
        self.policy.server_role
    }

    pub fn routing_strategy(&self) -> RoutingStrategy {
        self.policy.routing_strategy
    }

    pub fn policy(&self) -> &GroupPolicy {
        &self.policy
    }

    pub fn cache_api(&self) -> &Arc<dyn MetadataCacheApi> {
        &self.cache_api
    }

    pub fn is_subscribed(&self) -> bool {
        matches!(self.subscription_state(), Subscription::Subscribed(_))
    }

    /// Provider reachability as last reported. False until the group has
    /// heard from the provider.
    pub fn metadata_reachable(&self) -> bool {
        self.registry.lock().metadata_reachable.unwrap_or(false)
    }

    /// View id of the snapshot currently routed on.
    pub fn view_id(&self) -> u64 {
        self.registry.lock().snapshot_view_id
    }

    fn subscription_state(&self) -> Subscription {
        *self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register with the metadata provider and pull the current view.
    /// Calling it again while subscribed does nothing.
    pub fn subscribe_for_metadata_cache_changes(&self) -> Result<(), RoutingError> {
        {
            let mut subscription = self
                .subscription
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match *subscription {
                Subscription::Subscribed(_) => return Ok(()),
                Subscription::Stopped => return Err(RoutingError::Stopped(self.name.clone())),
                Subscription::Unsubscribed => {}
            }

            let listener = Arc::new(GroupListener {
                group: self.me.clone(),
            });
            let id = self.cache_api.add_state_listener(&self.replicaset, listener);
            *subscription = Subscription::Subscribed(id);
        }

        tracing::info!(
            group = %self.name,
            replicaset = %self.replicaset,
            "Subscribed for metadata cache changes"
        );

        // Registered first so that no change between lookup and
        // registration is lost; duplicates are filtered by view id.
        let current = self.cache_api.lookup_replicaset(&self.replicaset);
        self.notify(
            &current.instances,
            current.md_servers_reachable,
            current.view_id,
        );
        Ok(())
    }

    /// Unregister from the provider. The group cannot be started again.
    pub fn stop(&self) {
        let previous = {
            let mut subscription = self
                .subscription
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *subscription, Subscription::Stopped)
        };

        if let Subscription::Subscribed(id) = previous {
            self.cache_api.remove_state_listener(&self.replicaset, id);
            tracing::info!(group = %self.name, "Unsubscribed from metadata cache changes");
        }
    }

    /// Apply a topology notification. Stale, duplicate and malformed
    /// notifications are dropped.
    pub fn notify(&self, instances: &[ManagedInstance], md_servers_reachable: bool, view_id: u64) {
        let events = {
            let mut state = self.registry.lock();

            if state.is_stale(view_id) {
                tracing::debug!(
                    group = %self.name,
                    view_id,
                    last_view_id = ?state.last_view_id,
                    "Ignoring stale metadata notification"
                );
                metrics::record_notification(&self.name, "stale");
                return;
            }

            if let Some(id) = find_duplicate_id(instances) {
                tracing::warn!(
                    group = %self.name,
                    view_id,
                    instance = %id,
                    "Dropping metadata notification with duplicate instance id"
                );
                metrics::record_notification(&self.name, "malformed");
                return;
            }

            state.last_view_id = Some(view_id);
            metrics::record_notification(&self.name, "applied");
            self.on_instances_change(&mut state, instances, md_servers_reachable, view_id)
        };

        for event in events {
            tracing::info!(
                group = %self.name,
                destination = %event.destination.address,
                id = %event.destination.id,
                reason = %event.reason,
                "Invalidating connections"
            );
            metrics::record_invalidation(&self.name, event.reason);
            self.invalidator.invalidate(event);
        }
    }

    /// Recompute the snapshot-derived state. Returns the invalidation
    /// signals to raise once the lock is released.
    fn on_instances_change(
        &self,
        state: &mut RegistryState,
        instances: &[ManagedInstance],
        md_servers_reachable: bool,
        view_id: u64,
    ) -> Vec<InvalidationEvent> {
        let mut events = Vec::new();

        // An unreachable provider with nothing to report keeps the last
        // known topology.
        if md_servers_reachable || !instances.is_empty() {
            let (allowed_before, _) = self.get_available(&state.snapshot, false);
            let previous = std::mem::replace(&mut state.snapshot, instances.to_vec());
            state.snapshot_view_id = view_id;
            let (allowed_after, _) = self.get_available(&state.snapshot, false);

            for node in allowed_before {
                if allowed_after.contains(&node) {
                    continue;
                }
                let reason = if was_promoted(&previous, &state.snapshot, &node.id) {
                    InvalidationReason::PromotedToPrimary
                } else {
                    InvalidationReason::Removed
                };
                events.push(self.invalidation(node, reason));
            }

            let (eligible, primary_fallback) = self.get_available(&state.snapshot, true);
            if primary_fallback && !state.primary_fallback {
                tracing::warn!(
                    group = %self.name,
                    "No secondary available, falling back to primaries"
                );
            }
            state.replace_eligible(eligible, primary_fallback);
            metrics::record_available(&self.name, state.eligible.len());

            tracing::info!(
                group = %self.name,
                view_id,
                instances = state.snapshot.len(),
                eligible = state.eligible.len(),
                primary_fallback,
                "Metadata change applied"
            );
        } else if state.metadata_reachable.is_some() {
            tracing::warn!(
                group = %self.name,
                view_id,
                "Metadata servers reported no instances, keeping last known topology"
            );
        } else {
            tracing::debug!(group = %self.name, view_id, "No topology known yet");
        }

        // The first accepted notification only sets the baseline: nothing
        // can be connected through the group before it.
        match state.metadata_reachable {
            Some(was_reachable) if was_reachable != md_servers_reachable => {
                if md_servers_reachable {
                    tracing::info!(group = %self.name, "Metadata servers reachable again");
                } else {
                    tracing::warn!(
                        group = %self.name,
                        disconnect = self.policy.disconnect_on_metadata_unavailable,
                        "Metadata servers unreachable"
                    );
                    if self.policy.disconnect_on_metadata_unavailable {
                        let (allowed, _) = self.get_available(&state.snapshot, false);
                        events.extend(allowed.into_iter().map(|node| {
                            self.invalidation(node, InvalidationReason::MetadataUnavailable)
                        }));
                    }
                }
            }
            Some(_) => {}
            None => {
                tracing::debug!(
                    group = %self.name,
                    reachable = md_servers_reachable,
                    "Metadata servers reachability baseline"
                );
            }
        }
        state.metadata_reachable = Some(md_servers_reachable);

        events
    }

    fn invalidation(
        &self,
        destination: AvailableDestination,
        reason: InvalidationReason,
    ) -> InvalidationEvent {
        InvalidationEvent {
            group: self.name.clone(),
            destination,
            reason,
        }
    }

    /// Nodes of `instances` this group may route to. The flag reports that
    /// primaries were substituted for missing secondaries, which only
    /// happens for new connections.
    pub fn get_available(
        &self,
        instances: &[ManagedInstance],
        for_new_connections: bool,
    ) -> (Vec<AvailableDestination>, bool) {
        let available: Vec<AvailableDestination> = instances
            .iter()
            .filter(|i| self.policy.admits(i.mode, for_new_connections))
            .map(AvailableDestination::from)
            .collect();

        if for_new_connections && available.is_empty() && self.policy.falls_back_to_primaries() {
            let primaries = self.get_available_primaries(instances);
            let fallback = !primaries.is_empty();
            return (primaries, fallback);
        }

        (available, false)
    }

    /// Primary nodes of `instances`, regardless of the group's role.
    pub fn get_available_primaries(
        &self,
        instances: &[ManagedInstance],
    ) -> Vec<AvailableDestination> {
        instances
            .iter()
            .filter(|i| i.mode.is_primary())
            .map(AvailableDestination::from)
            .collect()
    }

    fn balance(
        &self,
        available: &[AvailableDestination],
        primary_fallback: bool,
        start_pos: &mut usize,
        view_id: u64,
    ) -> Destinations {
        let ordered = balance::balance(self.policy.routing_strategy, available, start_pos);
        if ordered.is_empty() {
            tracing::debug!(group = %self.name, view_id, "No destination available");
        }
        metrics::record_selection(&self.name, !ordered.is_empty());
        Destinations::new(ordered, primary_fallback, view_id)
    }

    fn select(&self, state: &mut RegistryState) -> Destinations {
        let RegistryState {
            eligible,
            primary_fallback,
            start_pos,
            snapshot_view_id,
            ..
        } = state;
        self.balance(eligible, *primary_fallback, start_pos, *snapshot_view_id)
    }

    /// Current primaries in snapshot order, whatever the group's role.
    /// Does not move the rotation cursor.
    pub fn primary_destinations(&self) -> Destinations {
        let state = self.registry.lock();
        Destinations::new(
            self.get_available_primaries(&state.snapshot),
            false,
            state.snapshot_view_id,
        )
    }

    /// Skip `n` destinations, e.g. after trying and failing against them.
    pub fn advance(&self, n: usize) {
        let mut state = self.registry.lock();
        let len = state.eligible.len();
        balance::advance(&mut state.start_pos, n, len);
    }
}

fn was_promoted(previous: &[ManagedInstance], current: &[ManagedInstance], id: &str) -> bool {
    let mode_of = |list: &[ManagedInstance]| list.iter().find(|i| i.id == id).map(|i| i.mode);
    matches!(
        (mode_of(previous), mode_of(current)),
        (Some(before), Some(after)) if !before.is_primary() && after.is_primary()
    )
}

impl RouteDestination for MetadataCacheDestination {
    fn add(&self, address: TcpAddress) {
        tracing::debug!(
            group = %self.name,
            address = %address,
            "Static destination ignored for metadata-cache routing"
        );
    }

    /// Always false: an empty replicaset is a transient condition handled
    /// at selection time.
    fn empty(&self) -> bool {
        false
    }

    /// Subscribes for topology changes. No quarantine is started, node
    /// liveness is tracked by the metadata provider.
    fn start(&self) -> Result<(), RoutingError> {
        self.subscribe_for_metadata_cache_changes()
    }

    fn get_destinations(&self) -> Vec<TcpAddress> {
        let state = self.registry.lock();
        self.get_available(&state.snapshot, false)
            .0
            .into_iter()
            .map(|d| d.address)
            .collect()
    }

    fn destinations(&self) -> Destinations {
        let mut state = self.registry.lock();
        self.select(&mut state)
    }

    fn refresh_destinations(&self, previous: &Destinations) -> Option<Destinations> {
        let mut state = self.registry.lock();
        if state.snapshot_view_id > previous.view_id() {
            Some(self.select(&mut state))
        } else {
            None
        }
    }
}

impl Drop for MetadataCacheDestination {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for MetadataCacheDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataCacheDestination")
            .field("name", &self.name)
            .field("cache_name", &self.cache_name)
            .field("replicaset", &self.replicaset)
            .field("policy", &self.policy)
            .field("subscription", &self.subscription_state())
            .finish()
    }
}
