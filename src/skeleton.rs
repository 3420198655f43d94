//! Skeleton blocks.
//!
//! Joints live in an arena owned by the [`Skeleton`]. Each joint owns its
//! ordered list of children and keeps a handle to its parent. Joints are
//! not blocks: they are flattened into the skeleton body in depth-first
//! pre-order, and their ids (1-based, 0 meaning "no parent") are assigned
//! while writing.
//!
//! A [`JointHandle`] is only valid for the skeleton that issued it, and
//! only until that skeleton's hierarchy is replaced by
//! [`Skeleton::set_root_joint`].

use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::attr::AttrElement;
use crate::io::{WireWrite, len_u32, varstr_len};
use crate::types::{Address, Encoding, Matrix4};
use crate::write::WriteError;

static NEXT_SKELETON_ID: AtomicU32 = AtomicU32::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JointHandle {
    skeleton: u32,
    generation: u32,
    index: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkeletonJoint {
    pub name: String,
    pub bind_matrix: Matrix4,
    pub attributes: AttrElement,
}

impl SkeletonJoint {
    pub fn new(name: impl Into<String>, bind_matrix: Matrix4) -> Self {
        Self {
            name: name.into(),
            bind_matrix,
            attributes: AttrElement::new(),
        }
    }

    fn calc_length(&self, enc: &Encoding) -> usize {
        // id + parent id
        4 + 4
            + varstr_len(&self.name)
            + Matrix4::encoded_len(enc)
            + self.attributes.calc_length(enc)
    }

    fn write<W: Write + ?Sized>(
        &self,
        w: &mut W,
        enc: &Encoding,
        id: u32,
        parent_id: u32,
    ) -> Result<(), WriteError> {
        w.put_u32(id)?;
        w.put_u32(parent_id)?;
        w.put_varstr(&self.name)?;
        w.put_matrix(&self.bind_matrix.0, enc)?;
        self.attributes.properties.write(w, enc)?;
        self.attributes.user_attributes.write(w, enc)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct JointNode {
    joint: SkeletonJoint,
    parent: Option<JointHandle>,
    children: Vec<JointHandle>,
}

#[derive(Debug, Clone)]
pub struct Skeleton {
    pub name: String,
    pub attributes: AttrElement,
    id: u32,
    generation: u32,
    joints: Vec<JointNode>,
}

impl Default for Skeleton {
    fn default() -> Self {
        Self {
            name: String::new(),
            attributes: AttrElement::new(),
            id: NEXT_SKELETON_ID.fetch_add(1, Ordering::Relaxed),
            generation: 0,
            joints: vec![],
        }
    }
}

/// Compares content only, not handle identity.
impl PartialEq for Skeleton {
    fn eq(&self, other: &Self) -> bool {
        let (ours, theirs) = (self.flatten(), other.flatten());
        self.name == other.name
            && self.attributes == other.attributes
            && ours.len() == theirs.len()
            && ours.iter().zip(theirs.iter()).all(|(a, b)| {
                a.1 == b.1
                    && a.2 == b.2
                    && self.joints[a.0.index].joint == other.joints[b.0.index].joint
            })
    }
}

impl Skeleton {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn handle(&self, index: usize) -> JointHandle {
        JointHandle {
            skeleton: self.id,
            generation: self.generation,
            index,
        }
    }

    fn node(&self, handle: JointHandle) -> Option<&JointNode> {
        if !self.owns(handle) {
            return None;
        }
        self.joints.get(handle.index)
    }

    fn owns(&self, handle: JointHandle) -> bool {
        handle.skeleton == self.id && handle.generation == self.generation
    }

    /// Replace the whole joint hierarchy with a single root joint.
    ///
    /// Handles issued before this call stop being valid.
    pub fn set_root_joint(&mut self, joint: SkeletonJoint) -> JointHandle {
        self.generation = self.generation.wrapping_add(1);
        self.joints.clear();
        self.joints.push(JointNode {
            joint,
            parent: None,
            children: vec![],
        });
        self.handle(0)
    }

    pub fn root_joint(&self) -> Option<JointHandle> {
        (!self.joints.is_empty()).then(|| self.handle(0))
    }

    pub fn add_child_joint(
        &mut self,
        parent: JointHandle,
        joint: SkeletonJoint,
    ) -> Result<JointHandle, WriteError> {
        if self.node(parent).is_none() {
            return Err(WriteError::UnknownJoint);
        }
        let handle = self.handle(self.joints.len());
        self.joints.push(JointNode {
            joint,
            parent: Some(parent),
            children: vec![],
        });
        self.joints[parent.index].children.push(handle);
        Ok(handle)
    }

    pub fn joint(&self, handle: JointHandle) -> Option<&SkeletonJoint> {
        self.node(handle).map(|n| &n.joint)
    }

    pub fn joint_mut(&mut self, handle: JointHandle) -> Option<&mut SkeletonJoint> {
        if !self.owns(handle) {
            return None;
        }
        self.joints.get_mut(handle.index).map(|n| &mut n.joint)
    }

    pub fn parent(&self, handle: JointHandle) -> Option<JointHandle> {
        self.node(handle).and_then(|n| n.parent)
    }

    pub fn children(&self, handle: JointHandle) -> &[JointHandle] {
        self.node(handle)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Joints in depth-first pre-order, paired with their wire id and
    /// the wire id of their parent.
    pub fn flatten(&self) -> Vec<(JointHandle, u32, u32)> {
        let mut ids = vec![0u32; self.joints.len()];
        let mut out = Vec::with_capacity(self.joints.len());
        let mut stack: Vec<JointHandle> = self.root_joint().into_iter().collect();
        while let Some(handle) = stack.pop() {
            let node = &self.joints[handle.index];
            let id = out.len() as u32 + 1;
            ids[handle.index] = id;
            let parent_id = node.parent.map(|p| ids[p.index]).unwrap_or(0);
            out.push((handle, id, parent_id));
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    pub fn references(&self) -> impl Iterator<Item = Address> + '_ {
        self.attributes
            .references()
            .chain(self.joints.iter().flat_map(|n| n.joint.attributes.references()))
    }

    pub fn calc_body_length(&self, enc: &Encoding) -> usize {
        varstr_len(&self.name)
            + 4
            + self.attributes.calc_length(enc)
            + self
                .joints
                .iter()
                .map(|n| n.joint.calc_length(enc))
                .sum::<usize>()
    }

    pub fn write_body<W: Write + ?Sized>(
        &self,
        w: &mut W,
        enc: &Encoding,
    ) -> Result<(), WriteError> {
        w.put_varstr(&self.name)?;
        w.put_u32(len_u32("joint count", self.joints.len())?)?;
        self.attributes.properties.write(w, enc)?;
        for (handle, id, parent_id) in self.flatten() {
            self.joints[handle.index].joint.write(w, enc, id, parent_id)?;
        }
        self.attributes.user_attributes.write(w, enc)?;
        Ok(())
    }
}
