/// CIP general status codes relevant to the message router. Concrete objects may report any of
/// the full CIP status table through `Response::general_status`; the router itself only ever
/// produces the three below.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum GeneralStatus {
    Success = 0x00,
    PathSegmentError = 0x04,
    PathDestinationUnknown = 0x05,
    PathSizeInvalid = 0x15,
}

impl From<GeneralStatus> for u8 {
    #[inline]
    fn from(status: GeneralStatus) -> u8 {
        status as u8
    }
}

/// Failure decoding an electronic path (C2).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PathError {
    /// Ran out of bytes mid-segment.
    Truncated,
    /// A segment type this decoder doesn't understand.
    UnknownSegment,
}

/// Failure parsing a CIP request (C3).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CipError {
    PathSegmentError,
    PathSizeInvalid,
}

impl From<PathError> for CipError {
    #[inline]
    fn from(_: PathError) -> Self {
        CipError::PathSegmentError
    }
}

impl CipError {
    #[inline]
    pub fn general_status(self) -> GeneralStatus {
        match self {
            CipError::PathSegmentError => GeneralStatus::PathSegmentError,
            CipError::PathSizeInvalid => GeneralStatus::PathSizeInvalid,
        }
    }
}

/// Failure registering a class (C1).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegistryError {
    /// A class with this `class_id` is already registered.
    Duplicate(u32),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::Duplicate(class_id) => {
                write!(f, "class id 0x{:08x} is already registered", class_id)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
