use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use tracing::debug;

use crate::object::{GeoObject, ObjectId};

/// 宿主（画布）暴露给依赖传播的最小接口：按 ID 查找、临时取出、放回。
pub trait ObjectStore {
    fn object(&self, id: &ObjectId) -> Option<&GeoObject>;

    fn take_object(&mut self, id: &ObjectId) -> Option<GeoObject>;

    fn restore_object(&mut self, object: GeoObject);
}

impl ObjectStore for HashMap<ObjectId, GeoObject> {
    fn object(&self, id: &ObjectId) -> Option<&GeoObject> {
        self.get(id)
    }

    fn take_object(&mut self, id: &ObjectId) -> Option<GeoObject> {
        self.remove(id)
    }

    fn restore_object(&mut self, object: GeoObject) {
        self.insert(object.id(), object);
    }
}

/// 从 `source` 出发沿 dependents 传播，对每个可达对象调用一次
/// `update_from_dependencies`，返回实际更新的对象 ID（按更新顺序）。
///
/// 可达集合内按拓扑序更新：一个对象总在它依赖的可达对象之后重算。
/// 环不做检查，环上剩余对象按 ID 顺序补更新一次。
pub fn notify_dependents(store: &mut dyn ObjectStore, source: &ObjectId) -> Vec<ObjectId> {
    let reachable = collect_reachable(store, source);
    if reachable.is_empty() {
        return Vec::new();
    }

    let mut pending: BTreeMap<ObjectId, usize> = BTreeMap::new();
    for id in &reachable {
        let count = store
            .object(id)
            .map(|object| {
                object
                    .dependencies()
                    .iter()
                    .filter(|dep| reachable.contains(*dep))
                    .count()
            })
            .unwrap_or(0);
        pending.insert(id.clone(), count);
    }

    let mut ready: VecDeque<ObjectId> = pending
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(id, _)| id.clone())
        .collect();
    let mut updated = Vec::with_capacity(reachable.len());

    loop {
        let next = match ready.pop_front() {
            Some(id) => id,
            None => match pending.keys().next() {
                // 剩余对象处于环上
                Some(id) => id.clone(),
                None => break,
            },
        };
        if pending.remove(&next).is_none() {
            continue;
        }
        let Some(mut object) = store.take_object(&next) else {
            continue;
        };
        object.update_from_dependencies(&*store);
        let dependents = object.dependents();
        store.restore_object(object);
        updated.push(next);

        for dependent in dependents {
            if let Some(count) = pending.get_mut(&dependent) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    ready.push_back(dependent);
                }
            }
        }
    }

    debug!(source = %source, updated = updated.len(), "依赖传播完成");
    updated
}

fn collect_reachable(store: &dyn ObjectStore, source: &ObjectId) -> BTreeSet<ObjectId> {
    let mut reachable = BTreeSet::new();
    let mut stack: Vec<ObjectId> = store
        .object(source)
        .map(|object| object.dependents().into_iter().collect())
        .unwrap_or_default();
    while let Some(id) = stack.pop() {
        if id == *source || !reachable.insert(id.clone()) {
            continue;
        }
        if let Some(object) = store.object(&id) {
            stack.extend(object.dependents());
        }
    }
    reachable.retain(|id| store.object(id).is_some());
    reachable
}
