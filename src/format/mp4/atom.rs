//! Serializable MP4 atom tree for header building.

/// One atom (boxes, in ISO 14496 terminology). An atom carries either
/// payload data or children, never both; full atoms additionally carry a
/// version byte and 24-bit flags before the payload.
#[derive(Debug, Clone)]
pub struct Atom {
    fourcc: [u8; 4],
    version_flags: Option<(u8, u32)>,
    data: Vec<u8>,
    children: Vec<Atom>,
}

impl Atom {
    /// Create an empty atom of the given type.
    pub fn new(fourcc: &[u8; 4]) -> Self {
        Atom {
            fourcc: *fourcc,
            version_flags: None,
            data: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create an empty full atom with a version and flags field.
    pub fn full(fourcc: &[u8; 4], version: u8, flags: u32) -> Self {
        Atom {
            fourcc: *fourcc,
            version_flags: Some((version, flags)),
            data: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn fourcc(&self) -> &[u8; 4] {
        &self.fourcc
    }

    /// Attach payload data. Replaces children, if any were added.
    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.children.clear();
        self.data = data;
        self
    }

    /// Append a child atom. Replaces payload data, if any was set.
    pub fn with_child(mut self, child: Atom) -> Self {
        self.data.clear();
        self.children.push(child);
        self
    }

    /// Serialized size including the 8-byte header.
    pub fn size(&self) -> u32 {
        let mut size = 8u32;
        if self.version_flags.is_some() {
            size += 4;
        }
        if !self.data.is_empty() {
            size += self.data.len() as u32;
        } else {
            for child in &self.children {
                size += child.size();
            }
        }
        size
    }

    /// Look up a descendant by a dot-separated fourcc path, e.g.
    /// `"trak.mdia.minf.stbl.stco"`.
    pub fn child_mut(&mut self, path: &str) -> Option<&mut Atom> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let child = self
            .children
            .iter_mut()
            .find(|c| &c.fourcc[..] == head.as_bytes())?;
        match rest {
            Some(rest) => child.child_mut(rest),
            None => Some(child),
        }
    }

    /// Mutable access to the payload, for fields patched after sizing.
    pub fn data_mut(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }

    /// Serialize the atom and its subtree.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size() as usize);
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.size().to_be_bytes());
        out.extend_from_slice(&self.fourcc);
        if let Some((version, flags)) = self.version_flags {
            out.push(version);
            out.extend_from_slice(&flags.to_be_bytes()[1..4]);
        }
        if !self.data.is_empty() {
            out.extend_from_slice(&self.data);
        } else {
            for child in &self.children {
                child.write_to(out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_atom() {
        let atom = Atom::new(b"mdat");
        assert_eq!(atom.size(), 8);
        assert_eq!(atom.to_bytes(), vec![0, 0, 0, 8, b'm', b'd', b'a', b't']);
    }

    #[test]
    fn test_full_atom_layout() {
        let atom = Atom::full(b"tkhd", 0, 0x07).with_data(vec![0xaa, 0xbb]);
        let bytes = atom.to_bytes();
        assert_eq!(atom.size(), 14);
        assert_eq!(&bytes[0..4], &[0, 0, 0, 14]);
        assert_eq!(&bytes[4..8], b"tkhd");
        assert_eq!(&bytes[8..12], &[0, 0, 0, 7]); // version 0, flags 7
        assert_eq!(&bytes[12..14], &[0xaa, 0xbb]);
    }

    #[test]
    fn test_nested_sizes() {
        let tree = Atom::new(b"moov")
            .with_child(Atom::new(b"trak").with_child(Atom::new(b"mdia").with_data(vec![1, 2, 3])));
        assert_eq!(tree.size(), 8 + 8 + 11);
        let bytes = tree.to_bytes();
        assert_eq!(bytes.len() as u32, tree.size());
        assert_eq!(&bytes[4..8], b"moov");
        assert_eq!(&bytes[12..16], b"trak");
    }

    #[test]
    fn test_child_path_lookup() {
        let mut tree = Atom::new(b"moov").with_child(
            Atom::new(b"trak")
                .with_child(Atom::new(b"mdia").with_child(Atom::new(b"stco").with_data(vec![0; 8]))),
        );
        assert!(tree.child_mut("trak.mdia.stco").is_some());
        assert!(tree.child_mut("trak.mdia.stsz").is_none());
        tree.child_mut("trak.mdia.stco")
            .map(|a| a.data_mut()[7] = 0x42);
        let bytes = tree.to_bytes();
        assert_eq!(*bytes.last().unwrap(), 0x42);
    }
}
