use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use sacred_core::geometry::{Bounds2D, LineType, Point2};
use sacred_core::object::DEFAULT_TOLERANCE;
use sacred_core::{
    Circle, GeoObject, GeometricObject, Identifiable, Line, ObjectId, ObjectType, Point, Polygon,
    SharedPoint, Text, notify_dependents,
};
use tracing::debug;

use crate::errors::EngineError;

const DEMO_RADIUS: f64 = 100.0;

/// 画布运行参数，通常由配置文件的 `[canvas]` 段提供。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSettings {
    pub hit_tolerance: f64,
    pub enforce_locks: bool,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            hit_tolerance: DEFAULT_TOLERANCE,
            enforce_locks: true,
        }
    }
}

/// 演示构造中的关键对象。
#[derive(Debug, Clone)]
pub struct DemoObjects {
    pub center_a: ObjectId,
    pub center_b: ObjectId,
    pub circle_a: ObjectId,
    pub circle_b: ObjectId,
    pub upper: ObjectId,
    pub lower: ObjectId,
    pub chord: ObjectId,
    pub hexagon: ObjectId,
    pub label: ObjectId,
}

/// 画布持有全部活动对象，维护依赖关系的双向记录，并在每次修改后自动传播。
///
/// 对象按添加顺序叠放，后添加的在上层。
#[derive(Debug)]
pub struct Canvas {
    objects: HashMap<ObjectId, GeoObject>,
    order: Vec<ObjectId>,
    selected: HashSet<ObjectId>,
    settings: CanvasSettings,
}

impl Canvas {
    pub fn new() -> Self {
        Self::with_settings(CanvasSettings::default())
    }

    pub fn with_settings(settings: CanvasSettings) -> Self {
        Self {
            objects: HashMap::new(),
            order: Vec::new(),
            selected: HashSet::new(),
            settings,
        }
    }

    #[inline]
    pub fn settings(&self) -> CanvasSettings {
        self.settings
    }

    #[inline]
    pub fn set_settings(&mut self, settings: CanvasSettings) {
        self.settings = settings;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    pub fn object(&self, id: &ObjectId) -> Option<&GeoObject> {
        self.objects.get(id)
    }

    /// 按叠放顺序（自底向上）遍历对象。
    pub fn objects(&self) -> impl Iterator<Item = &GeoObject> + '_ {
        self.order.iter().filter_map(|id| self.objects.get(id))
    }

    #[inline]
    pub fn ids(&self) -> &[ObjectId] {
        &self.order
    }

    /// 清空全部对象与选中集。
    pub fn clear(&mut self) {
        self.objects.clear();
        self.order.clear();
        self.selected.clear();
    }

    /// 用一组对象替换当前内容，返回成功加入的数量。重复 ID 的对象被跳过。
    pub fn load_objects(&mut self, objects: impl IntoIterator<Item = GeoObject>) -> usize {
        self.clear();
        let mut loaded = 0;
        for object in objects {
            match self.add_object(object) {
                Ok(_) => loaded += 1,
                Err(err) => debug!(error = %err, "跳过无法加入画布的对象"),
            }
        }
        self.relink_shared_points();
        loaded
    }

    /// 注册对象。
    ///
    /// 新对象的依赖若已在画布中，对方的被依赖集合同步登记；已有对象若依赖新对象，
    /// 新对象的被依赖集合同样补齐。多边形顶点、文字锚点与画布中同 ID 的点共享同一句柄。
    pub fn add_object(&mut self, object: impl Into<GeoObject>) -> Result<ObjectId, EngineError> {
        let mut object = object.into();
        let id = object.id();
        if self.objects.contains_key(&id) {
            return Err(EngineError::DuplicateObject(id));
        }

        for held in object.held_points() {
            if let Some(GeoObject::Point(live)) = self.objects.get(&held.object_id()) {
                object.relink_point(live);
            }
        }
        if let GeoObject::Point(point) = &object {
            let point = point.clone();
            for other in self.objects.values_mut() {
                other.relink_point(&point);
            }
        }

        for source in object.dependencies() {
            if let Some(existing) = self.objects.get_mut(&source) {
                existing.with_object_mut(|other| other.base_mut().add_dependent(&id));
            }
        }
        let waiting: Vec<ObjectId> = self
            .objects
            .values()
            .filter(|other| other.dependencies().contains(&id))
            .map(GeoObject::id)
            .collect();
        object.with_object_mut(|inner| {
            for dependent in &waiting {
                inner.base_mut().add_dependent(dependent);
            }
        });

        object.update_from_dependencies(&self.objects);
        debug!(id = %id, kind = %object.object_type(), "已添加对象");
        self.objects.insert(id.clone(), object);
        self.order.push(id.clone());
        Ok(id)
    }

    /// 移除对象，并清理其余对象中指向它的悬空 ID（锚定随之解除）。
    pub fn remove_object(&mut self, id: &ObjectId) -> Result<GeoObject, EngineError> {
        self.check_mutable(id)?;
        let object = self
            .objects
            .remove(id)
            .ok_or_else(|| EngineError::ObjectNotFound(id.clone()))?;
        self.order.retain(|existing| existing != id);
        self.selected.remove(id);
        for other in self.objects.values_mut() {
            forget_reference(other, id);
        }
        debug!(id = %id, kind = %object.object_type(), "已移除对象");
        Ok(object)
    }

    /// 让 `dependent` 依赖 `dependency`，两侧集合同时更新。会形成环的链接被拒绝。
    pub fn link(&mut self, dependent: &ObjectId, dependency: &ObjectId) -> Result<(), EngineError> {
        self.require(dependent)?;
        self.require(dependency)?;
        if dependent == dependency || self.reaches(dependent, dependency) {
            return Err(EngineError::DependencyCycle {
                dependent: dependent.clone(),
                dependency: dependency.clone(),
            });
        }
        if let Some(object) = self.objects.get_mut(dependent) {
            object.with_object_mut(|inner| inner.base_mut().add_dependency(dependency));
        }
        if let Some(object) = self.objects.get_mut(dependency) {
            object.with_object_mut(|inner| inner.base_mut().add_dependent(dependent));
        }
        Ok(())
    }

    /// 解除依赖。被依赖方是 `dependent` 直接持有的点时不做任何事并返回 `false`。
    pub fn unlink(&mut self, dependent: &ObjectId, dependency: &ObjectId) -> Result<bool, EngineError> {
        let holder = self.require(dependent)?;
        if holds_point(holder, dependency) {
            return Ok(false);
        }
        let mut changed = false;
        if let Some(object) = self.objects.get_mut(dependent) {
            changed |= object.release_anchor(dependency);
            changed |= object.with_object_mut(|inner| inner.base_mut().remove_dependency(dependency));
        }
        if let Some(object) = self.objects.get_mut(dependency) {
            changed |= object.with_object_mut(|inner| inner.base_mut().remove_dependent(dependent));
        }
        Ok(changed)
    }

    pub fn set_locked(&mut self, id: &ObjectId, locked: bool) -> Result<(), EngineError> {
        let object = self
            .objects
            .get_mut(id)
            .ok_or_else(|| EngineError::ObjectNotFound(id.clone()))?;
        object.with_object_mut(|inner| inner.base_mut().locked = locked);
        Ok(())
    }

    pub fn set_visible(&mut self, id: &ObjectId, visible: bool) -> Result<(), EngineError> {
        let object = self
            .objects
            .get_mut(id)
            .ok_or_else(|| EngineError::ObjectNotFound(id.clone()))?;
        object.with_object_mut(|inner| inner.base_mut().visible = visible);
        Ok(())
    }

    /// 平移对象并传播，返回被重算的依赖对象。
    pub fn move_object(&mut self, id: &ObjectId, dx: f64, dy: f64) -> Result<Vec<ObjectId>, EngineError> {
        self.move_objects(std::slice::from_ref(id), dx, dy)
    }

    pub fn rotate_object(
        &mut self,
        id: &ObjectId,
        angle_degrees: f64,
        center: Option<Point2>,
    ) -> Result<Vec<ObjectId>, EngineError> {
        self.rotate_objects(std::slice::from_ref(id), angle_degrees, center)
    }

    pub fn scale_object(
        &mut self,
        id: &ObjectId,
        sx: f64,
        sy: f64,
        center: Option<Point2>,
    ) -> Result<Vec<ObjectId>, EngineError> {
        self.scale_objects(std::slice::from_ref(id), sx, sy, center)
    }

    pub fn move_objects(&mut self, ids: &[ObjectId], dx: f64, dy: f64) -> Result<Vec<ObjectId>, EngineError> {
        self.transform(ids, Transform::Move { dx, dy })
    }

    pub fn rotate_objects(
        &mut self,
        ids: &[ObjectId],
        angle_degrees: f64,
        center: Option<Point2>,
    ) -> Result<Vec<ObjectId>, EngineError> {
        self.transform(
            ids,
            Transform::Rotate {
                angle: angle_degrees,
                center,
            },
        )
    }

    pub fn scale_objects(
        &mut self,
        ids: &[ObjectId],
        sx: f64,
        sy: f64,
        center: Option<Point2>,
    ) -> Result<Vec<ObjectId>, EngineError> {
        self.transform(ids, Transform::Scale { sx, sy, center })
    }

    /// 把画布中的点追加为多边形顶点。
    pub fn add_polygon_vertex(
        &mut self,
        polygon_id: &ObjectId,
        point_id: &ObjectId,
    ) -> Result<Vec<ObjectId>, EngineError> {
        self.check_mutable(polygon_id)?;
        let point = match self.objects.get(point_id) {
            Some(GeoObject::Point(point)) => point.clone(),
            Some(other) => {
                return Err(EngineError::TypeMismatch {
                    id: point_id.clone(),
                    expected: ObjectType::Point,
                    found: other.object_type(),
                });
            }
            None => return Err(EngineError::ObjectNotFound(point_id.clone())),
        };
        self.polygon_mut(polygon_id)?.add_vertex(point);
        if let Some(source) = self.objects.get_mut(point_id) {
            source.with_object_mut(|inner| inner.base_mut().add_dependent(polygon_id));
        }
        Ok(self.propagate(std::slice::from_ref(polygon_id)))
    }

    /// 按下标移除多边形顶点，返回被移除的点。点本身仍留在画布中。
    pub fn remove_polygon_vertex(
        &mut self,
        polygon_id: &ObjectId,
        index: usize,
    ) -> Result<SharedPoint, EngineError> {
        self.check_mutable(polygon_id)?;
        let (removed, still_held) = {
            let polygon = self.polygon_mut(polygon_id)?;
            let len = polygon.vertex_count();
            let removed = polygon
                .remove_vertex(index)
                .ok_or_else(|| EngineError::VertexOutOfRange {
                    id: polygon_id.clone(),
                    index,
                    len,
                })?;
            let still_held = polygon.base().depends_on(&removed.object_id());
            (removed, still_held)
        };
        if !still_held {
            if let Some(source) = self.objects.get_mut(&removed.object_id()) {
                source.with_object_mut(|inner| inner.base_mut().remove_dependent(polygon_id));
            }
        }
        self.propagate(std::slice::from_ref(polygon_id));
        Ok(removed)
    }

    /// 复制对象并加入画布。深复制时被引用的点也一并加入。
    pub fn duplicate_object(&mut self, id: &ObjectId, deep: bool) -> Result<ObjectId, EngineError> {
        let source = self.require(id)?;
        let mut copy = if deep {
            source.duplicate_deep()
        } else {
            source.duplicate()
        };
        copy.with_object_mut(|inner| {
            let stale: Vec<ObjectId> = inner.base().dependents().iter().cloned().collect();
            for dependent in &stale {
                inner.base_mut().remove_dependent(dependent);
            }
        });
        if deep {
            for point in copy.held_points() {
                self.add_object(GeoObject::Point(point))?;
            }
        }
        self.add_object(copy)
    }

    /// 让所有多边形 / 文字改用画布中同 ID 点的句柄，返回替换次数。
    pub fn relink_shared_points(&mut self) -> usize {
        let points: Vec<SharedPoint> = self
            .objects
            .values()
            .filter_map(|object| object.as_point().cloned())
            .collect();
        let mut relinked = 0;
        for object in self.objects.values_mut() {
            for point in &points {
                relinked += object.relink_point(point);
            }
        }
        if relinked > 0 {
            debug!(relinked, "已重新连接共享点");
        }
        relinked
    }

    /// 最上层的可见命中对象。
    pub fn hit_test(&self, point: Point2, tolerance: f64) -> Option<ObjectId> {
        self.order
            .iter()
            .rev()
            .filter_map(|id| self.objects.get(id))
            .find(|object| object.is_visible() && object.contains_point(point, tolerance))
            .map(GeoObject::id)
    }

    /// 使用配置的拾取容差。
    pub fn pick(&self, point: Point2) -> Option<ObjectId> {
        self.hit_test(point, self.settings.hit_tolerance)
    }

    /// 所有可见对象的包围盒。
    pub fn bounds(&self) -> Option<Bounds2D> {
        union_bounds(self.objects().filter(|object| object.is_visible()))
    }

    pub fn intersections(&self, a: &ObjectId, b: &ObjectId) -> Result<Vec<Point2>, EngineError> {
        let first = self.require(a)?;
        let second = self.require(b)?;
        Ok(first.intersect(second))
    }

    #[inline]
    pub fn selection_len(&self) -> usize {
        self.selected.len()
    }

    #[inline]
    pub fn is_selected(&self, id: &ObjectId) -> bool {
        self.selected.contains(id)
    }

    pub fn select(&mut self, id: &ObjectId) -> Result<(), EngineError> {
        self.require(id)?;
        self.selected.insert(id.clone());
        Ok(())
    }

    pub fn select_all(&mut self) {
        self.selected.extend(self.order.iter().cloned());
    }

    /// 返回之前是否处于选中状态。
    pub fn deselect(&mut self, id: &ObjectId) -> bool {
        self.selected.remove(id)
    }

    /// 返回切换后的状态。
    pub fn toggle_selection(&mut self, id: &ObjectId) -> Result<bool, EngineError> {
        self.require(id)?;
        if self.selected.insert(id.clone()) {
            Ok(true)
        } else {
            self.selected.remove(id);
            Ok(false)
        }
    }

    #[inline]
    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// 选中对象，按叠放顺序。
    pub fn selection(&self) -> Vec<ObjectId> {
        self.order
            .iter()
            .filter(|id| self.selected.contains(*id))
            .cloned()
            .collect()
    }

    pub fn selection_bounds(&self) -> Option<Bounds2D> {
        union_bounds(
            self.order
                .iter()
                .filter(|id| self.selected.contains(*id))
                .filter_map(|id| self.objects.get(id)),
        )
    }

    /// 重置画布并构造一个鱼形（vesica piscis）：两圆互过圆心，弦连接两交点，
    /// 外接正六边形共享其中三个点，中心放置标注。
    pub fn populate_demo(&mut self) -> Result<DemoObjects, EngineError> {
        self.clear();

        let half_chord = DEMO_RADIUS * 3f64.sqrt() / 2.0;
        let half_radius = DEMO_RADIUS / 2.0;
        let named = |x: f64, y: f64, name: &str| {
            let mut point = Point::new(x, y);
            point.base_mut().name = name.to_string();
            point.into_shared()
        };

        let a = named(0.0, 0.0, "A");
        let b = named(DEMO_RADIUS, 0.0, "B");
        let upper = named(half_radius, half_chord, "C");
        let lower = named(half_radius, -half_chord, "D");
        let west_upper = named(-half_radius, half_chord, "E");
        let west = named(-DEMO_RADIUS, 0.0, "F");
        let west_lower = named(-half_radius, -half_chord, "G");
        let middle = named(half_radius, 0.0, "M");

        let circle_a = Circle::from_center_point(&a.borrow(), DEMO_RADIUS);
        let circle_b = Circle::from_center_point(&b.borrow(), DEMO_RADIUS);
        let chord = Line::between(&upper.borrow(), &lower.borrow(), LineType::Segment);
        let hexagon = Polygon::new(vec![
            b.clone(),
            upper.clone(),
            west_upper.clone(),
            west.clone(),
            west_lower.clone(),
            lower.clone(),
        ]);
        let label = Text::new(middle.clone(), "Vesica Piscis");

        let points = [&a, &b, &upper, &lower, &west_upper, &west, &west_lower, &middle];
        for point in points {
            self.add_object(point.clone())?;
        }
        let ids = DemoObjects {
            center_a: a.object_id(),
            center_b: b.object_id(),
            upper: upper.object_id(),
            lower: lower.object_id(),
            circle_a: self.add_object(circle_a)?,
            circle_b: self.add_object(circle_b)?,
            chord: self.add_object(chord)?,
            hexagon: self.add_object(hexagon)?,
            label: self.add_object(label)?,
        };

        debug!(
            objects = self.len(),
            circle_a = %ids.circle_a,
            circle_b = %ids.circle_b,
            hexagon = %ids.hexagon,
            "已创建演示构造"
        );
        Ok(ids)
    }

    fn require(&self, id: &ObjectId) -> Result<&GeoObject, EngineError> {
        self.objects
            .get(id)
            .ok_or_else(|| EngineError::ObjectNotFound(id.clone()))
    }

    fn check_mutable(&self, id: &ObjectId) -> Result<(), EngineError> {
        let object = self.require(id)?;
        if self.settings.enforce_locks && object.is_locked() {
            return Err(EngineError::ObjectLocked(id.clone()));
        }
        Ok(())
    }

    fn polygon_mut(&mut self, id: &ObjectId) -> Result<&mut Polygon, EngineError> {
        match self.objects.get_mut(id) {
            Some(GeoObject::Polygon(polygon)) => Ok(polygon),
            Some(other) => Err(EngineError::TypeMismatch {
                id: id.clone(),
                expected: ObjectType::Polygon,
                found: other.object_type(),
            }),
            None => Err(EngineError::ObjectNotFound(id.clone())),
        }
    }

    /// 沿被依赖方向从 `from` 出发能否到达 `to`。
    fn reaches(&self, from: &ObjectId, to: &ObjectId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![from.clone()];
        while let Some(id) = stack.pop() {
            if id == *to {
                return true;
            }
            if !visited.insert(id.clone()) {
                continue;
            }
            if let Some(object) = self.objects.get(&id) {
                stack.extend(object.dependents());
            }
        }
        false
    }

    /// 先检查全部锁定状态，再变换，最后统一传播。
    ///
    /// 多边形顶点、文字锚点以及圆心 / 线端点锚定的点都由持有者带动，每个点只变换一次，
    /// 使用首个持有者的枢轴；批次中未被任何持有者带动的点按 `center` 变换。
    fn transform(&mut self, ids: &[ObjectId], op: Transform) -> Result<Vec<ObjectId>, EngineError> {
        for id in ids {
            self.check_mutable(id)?;
        }
        let mut unique = HashSet::new();
        let batch: Vec<&ObjectId> = ids.iter().filter(|id| unique.insert(*id)).collect();

        let mut driven: Vec<(SharedPoint, Option<Point2>)> = Vec::new();
        let mut holders: Vec<(ObjectId, Option<Point2>)> = Vec::new();
        for id in &batch {
            let Some(object) = self.objects.get(*id) else {
                continue;
            };
            if matches!(object, GeoObject::Point(_)) {
                continue;
            }
            let pivot = op.center().or_else(|| Some(object.default_pivot()));
            let anchored: Vec<SharedPoint> = object
                .anchors()
                .iter()
                .filter_map(|anchor| self.objects.get(anchor))
                .filter_map(GeoObject::as_point)
                .cloned()
                .collect();
            for point in object.held_points().into_iter().chain(anchored) {
                claim_point(&mut driven, point, pivot);
            }
            holders.push(((*id).clone(), pivot));
        }
        for id in &batch {
            if let Some(GeoObject::Point(point)) = self.objects.get(*id) {
                claim_point(&mut driven, point.clone(), op.center());
            }
        }

        let mut sources = Vec::with_capacity(driven.len() + holders.len());
        for (point, pivot) in &driven {
            op.apply(&mut *point.borrow_mut(), *pivot);
            sources.push(point.object_id());
        }
        for (id, pivot) in holders {
            match self.objects.get_mut(&id) {
                Some(GeoObject::Line(line)) => op.apply(line, pivot),
                Some(GeoObject::Circle(circle)) => op.apply(circle, pivot),
                Some(GeoObject::Text(text)) => {
                    if let Transform::Rotate { angle, .. } = op {
                        text.turn(angle);
                    }
                }
                _ => {}
            }
            sources.push(id);
        }
        debug!(points = driven.len(), sources = sources.len(), "已变换对象");
        Ok(self.propagate(&sources))
    }

    fn propagate(&mut self, sources: &[ObjectId]) -> Vec<ObjectId> {
        let mut seen = HashSet::new();
        let mut updated: Vec<ObjectId> = Vec::new();
        for source in sources {
            if !seen.insert(source.clone()) {
                continue;
            }
            for id in notify_dependents(&mut self.objects, source) {
                if !updated.contains(&id) {
                    updated.push(id);
                }
            }
        }
        updated
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

/// 画布批量变换的参数。
#[derive(Debug, Clone, Copy)]
enum Transform {
    Move { dx: f64, dy: f64 },
    Rotate { angle: f64, center: Option<Point2> },
    Scale { sx: f64, sy: f64, center: Option<Point2> },
}

impl Transform {
    fn center(self) -> Option<Point2> {
        match self {
            Transform::Move { .. } => None,
            Transform::Rotate { center, .. } | Transform::Scale { center, .. } => center,
        }
    }

    fn apply(self, object: &mut dyn GeometricObject, pivot: Option<Point2>) {
        match self {
            Transform::Move { dx, dy } => object.move_by(dx, dy),
            Transform::Rotate { angle, .. } => object.rotate(angle, pivot),
            Transform::Scale { sx, sy, .. } => object.scale(sx, sy, pivot),
        }
    }
}

/// 登记待变换的点；同一句柄只登记一次，保留首次给出的枢轴。
fn claim_point(
    driven: &mut Vec<(SharedPoint, Option<Point2>)>,
    point: SharedPoint,
    pivot: Option<Point2>,
) {
    if !driven.iter().any(|(seen, _)| Rc::ptr_eq(seen, &point)) {
        driven.push((point, pivot));
    }
}

fn holds_point(object: &GeoObject, id: &ObjectId) -> bool {
    object
        .held_points()
        .iter()
        .any(|point| point.object_id() == *id)
}

/// 从对象中抹去指向 `id` 的引用；仍被直接持有的点保留依赖记录。
fn forget_reference(object: &mut GeoObject, id: &ObjectId) {
    object.release_anchor(id);
    let held = holds_point(object, id);
    object.with_object_mut(|inner| {
        inner.base_mut().remove_dependent(id);
        if !held {
            inner.base_mut().remove_dependency(id);
        }
    });
}

fn union_bounds<'a>(objects: impl Iterator<Item = &'a GeoObject>) -> Option<Bounds2D> {
    let mut bounds = Bounds2D::empty();
    let mut has = false;
    for object in objects {
        let object_bounds = object.bounds();
        if !object_bounds.is_empty() {
            bounds.include_bounds(&object_bounds);
            has = true;
        }
    }
    if has { Some(bounds) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo() -> (Canvas, DemoObjects) {
        let mut canvas = Canvas::new();
        let ids = canvas.populate_demo().unwrap();
        (canvas, ids)
    }

    fn circle_center(canvas: &Canvas, id: &ObjectId) -> Point2 {
        canvas.object(id).unwrap().as_circle().unwrap().center()
    }

    fn point_at(canvas: &Canvas, id: &ObjectId) -> Point2 {
        canvas.object(id).unwrap().point_position().unwrap()
    }

    #[test]
    fn demo_population_creates_linked_objects() {
        let (canvas, ids) = demo();
        assert_eq!(canvas.len(), 13);

        let a = canvas.object(&ids.center_a).unwrap();
        assert!(a.dependents().contains(&ids.circle_a));
        let upper = canvas.object(&ids.upper).unwrap();
        assert!(upper.dependents().contains(&ids.chord));
        assert!(upper.dependents().contains(&ids.hexagon));

        let hits = canvas.intersections(&ids.circle_a, &ids.circle_b).unwrap();
        assert_eq!(hits.len(), 2);
        let upper_position = upper.point_position().unwrap();
        assert!(hits.iter().any(|hit| hit.approx_eq(upper_position, 1e-9)));
    }

    #[test]
    fn moving_a_point_propagates_to_anchored_and_shared_owners() {
        let (mut canvas, ids) = demo();
        let updated = canvas.move_object(&ids.center_b, 10.0, 0.0).unwrap();
        assert!(updated.contains(&ids.circle_b));
        assert!(updated.contains(&ids.hexagon));
        assert_eq!(circle_center(&canvas, &ids.circle_b), Point2::new(110.0, 0.0));
        assert_eq!(circle_center(&canvas, &ids.circle_a), Point2::new(0.0, 0.0));

        let hexagon = canvas.object(&ids.hexagon).unwrap().as_polygon().unwrap();
        assert_eq!(hexagon.positions()[0], Point2::new(110.0, 0.0));

        canvas.move_object(&ids.upper, 0.0, 10.0).unwrap();
        let chord = canvas.object(&ids.chord).unwrap().as_line().unwrap();
        let upper = canvas.object(&ids.upper).unwrap().point_position().unwrap();
        assert_eq!(chord.start(), upper);
    }

    #[test]
    fn moving_a_polygon_updates_dependents_of_its_vertices() {
        let (mut canvas, ids) = demo();
        canvas.move_object(&ids.hexagon, 0.0, -5.0).unwrap();
        assert_eq!(circle_center(&canvas, &ids.circle_b), Point2::new(DEMO_RADIUS, -5.0));
        let chord = canvas.object(&ids.chord).unwrap().as_line().unwrap();
        assert!((chord.length() - DEMO_RADIUS * 3f64.sqrt()).abs() < 1e-9);
        assert_eq!(circle_center(&canvas, &ids.circle_a), Point2::new(0.0, 0.0));
    }

    #[test]
    fn selected_holder_and_vertex_move_once() {
        let (mut canvas, ids) = demo();
        canvas.select(&ids.hexagon).unwrap();
        canvas.select(&ids.center_b).unwrap();
        let selection = canvas.selection();
        canvas.move_objects(&selection, 1.0, 0.0).unwrap();
        let b = canvas.object(&ids.center_b).unwrap().point_position().unwrap();
        assert_eq!(b, Point2::new(DEMO_RADIUS + 1.0, 0.0));
    }

    #[test]
    fn polygon_and_shallow_copy_share_vertices_once() {
        let (mut canvas, ids) = demo();
        let copy = canvas.duplicate_object(&ids.hexagon, false).unwrap();
        canvas
            .move_objects(&[ids.hexagon.clone(), copy.clone()], 1.0, 0.0)
            .unwrap();
        assert_eq!(point_at(&canvas, &ids.center_b), Point2::new(DEMO_RADIUS + 1.0, 0.0));
        assert_eq!(circle_center(&canvas, &ids.circle_b), Point2::new(DEMO_RADIUS + 1.0, 0.0));

        let batch = [ids.hexagon.clone(), copy, ids.hexagon.clone()];
        canvas
            .rotate_objects(&batch, 180.0, Some(Point2::new(0.0, 0.0)))
            .unwrap();
        assert!(point_at(&canvas, &ids.center_b).approx_eq(Point2::new(-DEMO_RADIUS - 1.0, 0.0), 1e-9));
    }

    #[test]
    fn moving_anchored_shapes_moves_their_anchor_points() {
        let (mut canvas, ids) = demo();
        canvas.move_object(&ids.circle_a, 10.0, 0.0).unwrap();
        assert_eq!(point_at(&canvas, &ids.center_a), Point2::new(10.0, 0.0));
        assert_eq!(circle_center(&canvas, &ids.circle_a), Point2::new(10.0, 0.0));

        canvas.move_object(&ids.center_a, 0.0, 1.0).unwrap();
        assert_eq!(circle_center(&canvas, &ids.circle_a), Point2::new(10.0, 1.0));
        let circle = canvas.object(&ids.circle_a).unwrap().as_circle().unwrap();
        assert_eq!(circle.center_anchor(), Some(&ids.center_a));

        canvas.move_object(&ids.chord, 0.0, 5.0).unwrap();
        let upper = point_at(&canvas, &ids.upper);
        assert!(upper.approx_eq(Point2::new(DEMO_RADIUS / 2.0, DEMO_RADIUS * 3f64.sqrt() / 2.0 + 5.0), 1e-9));
        let chord = canvas.object(&ids.chord).unwrap().as_line().unwrap();
        assert_eq!(chord.start(), upper);
        assert_eq!(chord.end(), point_at(&canvas, &ids.lower));
        let hexagon = canvas.object(&ids.hexagon).unwrap().as_polygon().unwrap();
        assert_eq!(hexagon.positions()[1], upper);

        canvas.rotate_object(&ids.chord, 90.0, None).unwrap();
        let chord = canvas.object(&ids.chord).unwrap().as_line().unwrap();
        assert!(chord.start().approx_eq(point_at(&canvas, &ids.upper), 1e-9));
        assert!(chord.end().approx_eq(point_at(&canvas, &ids.lower), 1e-9));
        assert!((chord.length() - DEMO_RADIUS * 3f64.sqrt()).abs() < 1e-9);
        assert!(chord.midpoint().approx_eq(Point2::new(DEMO_RADIUS / 2.0, 5.0), 1e-9));

        let middle = canvas.object(&ids.label).unwrap().as_text().unwrap().position();
        canvas.rotate_object(&ids.label, 30.0, None).unwrap();
        let label = canvas.object(&ids.label).unwrap().as_text().unwrap();
        assert!((label.rotation - 30.0).abs() < 1e-9);
        assert_eq!(label.position(), middle);
    }

    #[test]
    fn locked_objects_refuse_mutation() {
        let (mut canvas, ids) = demo();
        canvas.set_locked(&ids.circle_a, true).unwrap();
        let err = canvas.move_object(&ids.circle_a, 1.0, 1.0).unwrap_err();
        assert!(matches!(err, EngineError::ObjectLocked(_)));
        assert!(canvas.remove_object(&ids.circle_a).is_err());

        // 依赖传播不受锁定影响
        canvas.move_object(&ids.center_a, 1.0, 0.0).unwrap();
        assert_eq!(circle_center(&canvas, &ids.circle_a), Point2::new(1.0, 0.0));

        canvas.set_settings(CanvasSettings {
            enforce_locks: false,
            ..canvas.settings()
        });
        assert!(canvas.move_object(&ids.circle_a, 1.0, 1.0).is_ok());
    }

    #[test]
    fn cycles_are_refused() {
        let (mut canvas, ids) = demo();
        let err = canvas.link(&ids.center_a, &ids.circle_a).unwrap_err();
        assert!(matches!(err, EngineError::DependencyCycle { .. }));
        let err = canvas.link(&ids.chord, &ids.chord).unwrap_err();
        assert!(matches!(err, EngineError::DependencyCycle { .. }));

        canvas.link(&ids.label, &ids.circle_b).unwrap();
        assert!(canvas.object(&ids.circle_b).unwrap().dependents().contains(&ids.label));
        assert!(canvas.unlink(&ids.label, &ids.circle_b).unwrap());
        assert!(!canvas.object(&ids.circle_b).unwrap().dependents().contains(&ids.label));
        // 顶点是多边形直接持有的点，不能解除
        assert!(!canvas.unlink(&ids.hexagon, &ids.upper).unwrap());
    }

    #[test]
    fn removing_a_point_cleans_dangling_ids() {
        let (mut canvas, ids) = demo();
        canvas.select(&ids.center_a).unwrap();
        canvas.remove_object(&ids.center_a).unwrap();
        assert!(!canvas.is_selected(&ids.center_a));
        let circle = canvas.object(&ids.circle_a).unwrap();
        assert!(circle.dependencies().is_empty());
        assert!(circle.as_circle().unwrap().center_anchor().is_none());

        canvas.remove_object(&ids.upper).unwrap();
        let hexagon = canvas.object(&ids.hexagon).unwrap();
        assert!(hexagon.dependencies().contains(&ids.upper));
        assert_eq!(hexagon.as_polygon().unwrap().vertex_count(), 6);
        let chord = canvas.object(&ids.chord).unwrap().as_line().unwrap();
        assert!(chord.start_anchor().is_none());
        assert!(chord.end_anchor().is_some());
    }

    #[test]
    fn polygon_vertices_follow_canvas_edits() {
        let (mut canvas, ids) = demo();
        let before = canvas.object(&ids.hexagon).unwrap().as_polygon().unwrap().area();
        canvas.add_polygon_vertex(&ids.hexagon, &ids.center_a).unwrap();
        assert!(canvas.object(&ids.center_a).unwrap().dependents().contains(&ids.hexagon));

        let removed = canvas.remove_polygon_vertex(&ids.hexagon, 6).unwrap();
        assert_eq!(removed.object_id(), ids.center_a);
        assert!(!canvas.object(&ids.center_a).unwrap().dependents().contains(&ids.hexagon));
        let after = canvas.object(&ids.hexagon).unwrap().as_polygon().unwrap().area();
        assert!((after - before).abs() < 1e-9);

        let err = canvas.remove_polygon_vertex(&ids.hexagon, 42).unwrap_err();
        assert!(matches!(err, EngineError::VertexOutOfRange { len: 6, .. }));
        let err = canvas.add_polygon_vertex(&ids.hexagon, &ids.chord).unwrap_err();
        assert!(matches!(err, EngineError::TypeMismatch { .. }));
        let err = canvas.add_polygon_vertex(&ids.chord, &ids.center_a).unwrap_err();
        assert!(matches!(err, EngineError::TypeMismatch { .. }));
    }

    #[test]
    fn hit_test_prefers_topmost_visible() {
        let (mut canvas, ids) = demo();
        let west = Point2::new(-DEMO_RADIUS, 0.0);
        assert_eq!(canvas.hit_test(west, 1.0), Some(ids.hexagon.clone()));
        canvas.set_visible(&ids.hexagon, false).unwrap();
        assert_eq!(canvas.hit_test(west, 1.0), Some(ids.circle_a.clone()));
        assert_eq!(canvas.pick(Point2::new(5_000.0, 5_000.0)), None);
    }

    #[test]
    fn selection_operations_work() {
        let (mut canvas, ids) = demo();
        assert_eq!(canvas.selection_len(), 0);
        assert!(canvas.selection_bounds().is_none());

        canvas.select(&ids.circle_a).unwrap();
        assert!(canvas.toggle_selection(&ids.circle_b).unwrap());
        assert!(!canvas.toggle_selection(&ids.circle_b).unwrap());
        assert!(canvas.deselect(&ids.circle_a));
        assert!(!canvas.deselect(&ids.circle_a));

        canvas.select(&ids.circle_a).unwrap();
        let bounds = canvas.selection_bounds().unwrap();
        assert!((bounds.width() - (2.0 * DEMO_RADIUS + 1.0)).abs() < 1e-9);

        let missing = ObjectId::new("missing");
        assert!(matches!(
            canvas.select(&missing).unwrap_err(),
            EngineError::ObjectNotFound(_)
        ));
        canvas.clear_selection();
        assert_eq!(canvas.selection_len(), 0);
        assert!(canvas.bounds().is_some());
    }

    #[test]
    fn duplicates_join_the_canvas() {
        let (mut canvas, ids) = demo();
        let shallow = canvas.duplicate_object(&ids.hexagon, false).unwrap();
        assert_eq!(canvas.len(), 14);
        let copy = canvas.object(&shallow).unwrap();
        assert!(copy.dependents().is_empty());
        assert!(canvas.object(&ids.upper).unwrap().dependents().contains(&shallow));

        let deep = canvas.duplicate_object(&ids.hexagon, true).unwrap();
        assert_eq!(canvas.len(), 14 + 6 + 1);
        canvas.move_object(&deep, 1000.0, 0.0).unwrap();
        assert_eq!(
            canvas.object(&ids.center_b).unwrap().point_position(),
            Some(Point2::new(DEMO_RADIUS, 0.0))
        );
    }

    #[test]
    fn loading_records_relinks_shared_points() {
        let (canvas, ids) = demo();
        let records: Vec<GeoObject> = canvas
            .objects()
            .map(|object| {
                sacred_core::ObjectFactory::create_from_dict(&object.to_dict()).unwrap()
            })
            .collect();

        let mut restored = Canvas::new();
        assert_eq!(restored.load_objects(records), 13);
        restored.move_object(&ids.upper, 0.0, 1.0).unwrap();
        let hexagon = restored.object(&ids.hexagon).unwrap().as_polygon().unwrap();
        let upper = restored.object(&ids.upper).unwrap().point_position().unwrap();
        assert_eq!(hexagon.positions()[1], upper);
        assert_eq!(restored.relink_shared_points(), 0);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut canvas = Canvas::new();
        let point = Point::new(1.0, 2.0).into_shared();
        canvas.add_object(point.clone()).unwrap();
        assert!(matches!(
            canvas.add_object(point).unwrap_err(),
            EngineError::DuplicateObject(_)
        ));
    }
}
