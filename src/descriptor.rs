//! Per-call modifiers for grblas operations

/// Method used to compute a matrix product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxbMethod {
    /// Pick a method from shapes, densities and the mask
    #[default]
    Auto,
    /// Dot products `C(i,j) = A(:,i)'*B(:,j)`
    Dot,
    /// Gather/scatter saxpy with a dense workspace
    Gustavson,
    /// Saxpy merging columns of A through a min-heap
    Heap,
}

/// Modifiers for a single operation
///
/// The defaults correspond to `C<M> = accum(C, T)` with a valued,
/// non-complemented mask, C kept outside the mask, and untransposed inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Descriptor {
    /// Delete entries of C outside the mask
    pub replace: bool,
    /// Use the complement of the mask
    pub mask_complement: bool,
    /// Use only the pattern of the mask, ignoring its values
    pub mask_structural: bool,
    /// Use the transpose of the first input
    pub transpose_a: bool,
    /// Use the transpose of the second input
    pub transpose_b: bool,
    /// Matrix multiply method
    pub axb_method: AxbMethod,
}

impl Descriptor {
    /// The default descriptor
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the replace flag
    pub fn replace(mut self) -> Self {
        self.replace = true;
        self
    }

    /// Complement the mask
    pub fn complement(mut self) -> Self {
        self.mask_complement = true;
        self
    }

    /// Use a structural mask
    pub fn structural(mut self) -> Self {
        self.mask_structural = true;
        self
    }

    /// Transpose the first input
    pub fn transpose_a(mut self) -> Self {
        self.transpose_a = true;
        self
    }

    /// Transpose the second input
    pub fn transpose_b(mut self) -> Self {
        self.transpose_b = true;
        self
    }

    /// Force a matrix multiply method
    pub fn method(mut self, method: AxbMethod) -> Self {
        self.axb_method = method;
        self
    }
}
