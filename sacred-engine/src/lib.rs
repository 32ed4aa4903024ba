pub mod canvas;
pub mod command;

pub use canvas::{Canvas, CanvasSettings, DemoObjects};

pub mod errors {
    use sacred_core::{ObjectId, ObjectType};
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("object {0} not found")]
        ObjectNotFound(ObjectId),
        #[error("object {0} already exists")]
        DuplicateObject(ObjectId),
        #[error("object {0} is locked")]
        ObjectLocked(ObjectId),
        #[error("linking {dependent} to {dependency} would create a dependency cycle")]
        DependencyCycle {
            dependent: ObjectId,
            dependency: ObjectId,
        },
        #[error("object {id} is a {found}, expected {expected}")]
        TypeMismatch {
            id: ObjectId,
            expected: ObjectType,
            found: ObjectType,
        },
        #[error("vertex index {index} out of range for polygon {id} with {len} vertices")]
        VertexOutOfRange {
            id: ObjectId,
            index: usize,
            len: usize,
        },
    }
}
