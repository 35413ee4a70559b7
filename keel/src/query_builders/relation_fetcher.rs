//! Foreign-key resolution in both directions, with a guard against reference cycles

use std::any::TypeId;
use std::collections::HashSet;

use super::unique::find_in_context;
use super::utils::Session;
use crate::entity_metadata::{describe, short_type_name};
use crate::types::{Entity, KeelResult, Reference};
use crate::value::Value;

/// What a foreign-key field contributes to an INSERT or UPDATE
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ForeignKeyValue {
    /// Nothing referenced; the column is left out
    Absent,
    Key(Value),
    /// A referenced entity that has not been saved yet
    Unpersisted,
}

/// Tracks the (type, id) pairs being resolved on the current call stack and
/// how deep the eager resolution has gone.
pub(crate) struct ResolveContext {
    in_progress: HashSet<(TypeId, String)>,
    depth: usize,
    max_depth: Option<usize>,
}

impl ResolveContext {
    pub(crate) fn new(max_depth: Option<usize>) -> Self {
        Self {
            in_progress: HashSet::new(),
            depth: 0,
            max_depth,
        }
    }

    /// Mark `(E, id)` as in progress; `false` when it already is, i.e. a cycle
    pub(crate) fn enter<E: 'static>(&mut self, id: &Value) -> bool {
        self.in_progress.insert((TypeId::of::<E>(), id.to_string()))
    }

    pub(crate) fn leave<E: 'static>(&mut self, id: &Value) {
        self.in_progress.remove(&(TypeId::of::<E>(), id.to_string()));
    }

    pub(crate) fn depth_exhausted(&self) -> bool {
        self.max_depth.map_or(false, |max| self.depth >= max)
    }

    fn descend(&mut self) {
        self.depth += 1;
    }

    fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

/// Type-erased access to one `Reference<T>` field of `E`
pub(crate) trait RelationLink<E>: Send + Sync {
    fn target_name(&self) -> &'static str;

    fn target_id_column(&self) -> KeelResult<String>;

    fn write_value(&self, owner: &E) -> KeelResult<ForeignKeyValue>;

    fn is_loaded(&self, owner: &E) -> bool;

    fn deferred_key(&self, owner: &E) -> Option<Value>;

    /// Store a raw key read from the owner's row; `Null` leaves the field unset
    fn set_deferred(&self, owner: &mut E, key: Value);

    /// Look up the target by `key` and store it in the owner's field.
    ///
    /// A missing row leaves the field unset.
    fn resolve(
        &self,
        session: Session<'_>,
        owner: &mut E,
        key: Value,
        ctx: &mut ResolveContext,
    ) -> KeelResult<()>;
}

pub(crate) struct ForeignKeyLink<E, T> {
    get: fn(&E) -> &Reference<T>,
    get_mut: fn(&mut E) -> &mut Reference<T>,
}

impl<E, T> ForeignKeyLink<E, T> {
    pub(crate) fn new(
        get: fn(&E) -> &Reference<T>,
        get_mut: fn(&mut E) -> &mut Reference<T>,
    ) -> Self {
        Self { get, get_mut }
    }
}

impl<E: Entity, T: Entity> RelationLink<E> for ForeignKeyLink<E, T> {
    fn target_name(&self) -> &'static str {
        short_type_name::<T>()
    }

    fn target_id_column(&self) -> KeelResult<String> {
        Ok(describe::<T>()?.id().column().to_string())
    }

    fn write_value(&self, owner: &E) -> KeelResult<ForeignKeyValue> {
        Ok(match (self.get)(owner) {
            Reference::Unset => ForeignKeyValue::Absent,
            Reference::Deferred(key) => ForeignKeyValue::Key(key.clone()),
            Reference::Loaded(target) => {
                let id = describe::<T>()?.id_value(target);
                if id.is_null() {
                    ForeignKeyValue::Unpersisted
                } else {
                    ForeignKeyValue::Key(id)
                }
            }
        })
    }

    fn is_loaded(&self, owner: &E) -> bool {
        (self.get)(owner).is_loaded()
    }

    fn deferred_key(&self, owner: &E) -> Option<Value> {
        (self.get)(owner).deferred_key().cloned()
    }

    fn set_deferred(&self, owner: &mut E, key: Value) {
        *(self.get_mut)(owner) = Reference::deferred(key);
    }

    fn resolve(
        &self,
        session: Session<'_>,
        owner: &mut E,
        key: Value,
        ctx: &mut ResolveContext,
    ) -> KeelResult<()> {
        ctx.descend();
        let found = find_in_context::<T>(session, key.clone(), ctx);
        ctx.ascend();

        *(self.get_mut)(owner) = match found? {
            Some(target) => Reference::to(target),
            None => {
                log::debug!(
                    "{} {} referenced from {} does not exist, leaving the reference unset",
                    short_type_name::<T>(),
                    key,
                    short_type_name::<E>()
                );
                Reference::Unset
            }
        };
        Ok(())
    }
}

/// Resolve every eager foreign key of a freshly read `entity`.
///
/// Past the configured depth the references stay deferred.
pub(crate) fn resolve_eager<E: Entity>(
    session: Session<'_>,
    entity: &mut E,
    ctx: &mut ResolveContext,
) -> KeelResult<()> {
    let descriptor = describe::<E>()?;
    for fk in descriptor.foreign_keys().iter().filter(|fk| !fk.is_lazy()) {
        let Some(key) = fk.link().deferred_key(entity) else {
            continue;
        };
        if ctx.depth_exhausted() {
            log::debug!(
                "resolve depth reached, {}.{} stays deferred",
                descriptor.entity_name(),
                fk.field()
            );
            continue;
        }
        fk.link().resolve(session, entity, key, ctx)?;
    }
    Ok(())
}
