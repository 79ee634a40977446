use std::{
    fmt::{self, Debug, Display},
    hash::Hash,
    mem::size_of,
    ptr::NonNull,
};

use super::object::{Closure, ObjectHeader, ObjectKind};

/// A tagged reference. One machine word, always interpretable from its bits alone.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Value(u64);

const _: () = assert!(size_of::<Value>() == size_of::<usize>());

impl Value {
    /*
     * Values use the low three bits as a tag. Heap objects are 8-byte aligned
     * so their pointers always carry a zero tag:
     *
     *     Nothing   {  0000:0000:0000:0000
     *     Object    {  PPPP:PPPP:PPPP:P000   (non-zero)
     *     Fixnum    {  IIII:IIII:IIII:I001   (61-bit signed payload)
     *     Character {  0000:0000:CCCC:C010
     *     Constant  {  0000:0000:0000:K110
     *
     * The all-zero word is the "nothing" marker that fills unused fixed argument
     * slots. Zeroed memory is therefore always scannable.
     */
    pub const TAG_BITS: u64 = 3;
    pub const TAG_MASK: u64 = (1 << Self::TAG_BITS) - 1;

    pub const OBJECT_TAG: u64 = 0b000;
    pub const FIXNUM_TAG: u64 = 0b001;
    pub const CHARACTER_TAG: u64 = 0b010;
    pub const CONSTANT_TAG: u64 = 0b110;

    pub const FIXNUM_BITS: u32 = 64 - Self::TAG_BITS as u32;
    pub const MOST_POSITIVE_FIXNUM: i64 = (1 << (Self::FIXNUM_BITS - 1)) - 1;
    pub const MOST_NEGATIVE_FIXNUM: i64 = -(1 << (Self::FIXNUM_BITS - 1));

    const CONSTANT_NIL: u64 = 0;
    const CONSTANT_TRUE: u64 = 1;
    const CONSTANT_FALSE: u64 = 2;
    const CONSTANT_UNBOUND: u64 = 3;

    pub const NOTHING: Value = Value(0);
    pub const NIL: Value = Self::constant(Self::CONSTANT_NIL);
    pub const TRUE: Value = Self::constant(Self::CONSTANT_TRUE);
    pub const FALSE: Value = Self::constant(Self::CONSTANT_FALSE);
    pub const UNBOUND: Value = Self::constant(Self::CONSTANT_UNBOUND);

    const fn constant(id: u64) -> Self {
        Self((id << Self::TAG_BITS) | Self::CONSTANT_TAG)
    }

    #[inline(always)]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Rebuilds a value from a word previously produced by [`Value::raw`].
    ///
    /// # Safety
    ///
    /// `bits` must be the bit pattern of a valid `Value`. Object pointers must
    /// still refer to a live object.
    #[inline(always)]
    pub const unsafe fn from_raw(bits: u64) -> Self {
        Self(bits)
    }

    #[inline(always)]
    pub const fn tag(self) -> u64 {
        self.0 & Self::TAG_MASK
    }

    #[inline]
    pub fn fixnum(value: i64) -> Self {
        debug_assert!(
            (Self::MOST_NEGATIVE_FIXNUM..=Self::MOST_POSITIVE_FIXNUM).contains(&value),
            "fixnum out of range: {value}"
        );
        Self(((value as u64) << Self::TAG_BITS) | Self::FIXNUM_TAG)
    }

    #[inline]
    pub const fn character(c: char) -> Self {
        Self(((c as u64) << Self::TAG_BITS) | Self::CHARACTER_TAG)
    }

    #[inline]
    pub const fn boolean(b: bool) -> Self {
        if b {
            Self::TRUE
        } else {
            Self::FALSE
        }
    }

    #[inline]
    pub fn object(header: NonNull<ObjectHeader>) -> Self {
        let bits = header.as_ptr() as usize as u64;
        debug_assert_eq!(bits & Self::TAG_MASK, 0, "misaligned heap object");
        Self(bits)
    }

    #[inline(always)]
    pub const fn is_nothing(self) -> bool {
        self.0 == 0
    }

    #[inline(always)]
    pub const fn is_object(self) -> bool {
        self.0 != 0 && self.tag() == Self::OBJECT_TAG
    }

    #[inline(always)]
    pub const fn is_fixnum(self) -> bool {
        self.tag() == Self::FIXNUM_TAG
    }

    #[inline(always)]
    pub const fn is_character(self) -> bool {
        self.tag() == Self::CHARACTER_TAG
    }

    #[inline(always)]
    pub const fn is_nil(self) -> bool {
        self.0 == Self::NIL.0
    }

    #[inline]
    pub fn as_fixnum(self) -> Option<i64> {
        self.is_fixnum().then(|| (self.0 as i64) >> Self::TAG_BITS)
    }

    #[inline]
    pub fn as_character(self) -> Option<char> {
        if self.is_character() {
            char::from_u32((self.0 >> Self::TAG_BITS) as u32)
        } else {
            None
        }
    }

    #[inline]
    pub fn as_object(self) -> Option<NonNull<ObjectHeader>> {
        if self.is_object() {
            NonNull::new(self.0 as usize as *mut ObjectHeader)
        } else {
            None
        }
    }

    /// Views this value as a closure.
    ///
    /// # Safety
    ///
    /// If the value is an object reference the object must be alive for `'a`.
    pub unsafe fn as_closure<'a>(self) -> Option<&'a Closure> {
        let header = self.as_object()?;
        match header.as_ref().kind {
            ObjectKind::Closure => Some(header.cast::<Closure>().as_ref()),
        }
    }

    pub fn decode(self) -> Decoded {
        match self.tag() {
            _ if self.is_nothing() => Decoded::Nothing,
            Self::OBJECT_TAG => Decoded::Object(unsafe {
                NonNull::new_unchecked(self.0 as usize as *mut ObjectHeader)
            }),
            Self::FIXNUM_TAG => Decoded::Fixnum((self.0 as i64) >> Self::TAG_BITS),
            Self::CHARACTER_TAG => Decoded::Character(
                char::from_u32((self.0 >> Self::TAG_BITS) as u32).unwrap_or(char::REPLACEMENT_CHARACTER),
            ),
            Self::CONSTANT_TAG => match self.0 >> Self::TAG_BITS {
                Self::CONSTANT_NIL => Decoded::Nil,
                Self::CONSTANT_TRUE => Decoded::Boolean(true),
                Self::CONSTANT_FALSE => Decoded::Boolean(false),
                Self::CONSTANT_UNBOUND => Decoded::Unbound,
                other => unreachable!("unknown constant #{other}"),
            },
            tag => unreachable!("unused tag {tag:#b}"),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::NOTHING
    }
}

/// The discriminated view of a [`Value`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decoded {
    Nothing,
    Object(NonNull<ObjectHeader>),
    Fixnum(i64),
    Character(char),
    Nil,
    Boolean(bool),
    Unbound,
}

impl From<Decoded> for Value {
    fn from(decoded: Decoded) -> Self {
        match decoded {
            Decoded::Nothing => Value::NOTHING,
            Decoded::Object(header) => Value::object(header),
            Decoded::Fixnum(i) => Value::fixnum(i),
            Decoded::Character(c) => Value::character(c),
            Decoded::Nil => Value::NIL,
            Decoded::Boolean(b) => Value::boolean(b),
            Decoded::Unbound => Value::UNBOUND,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::fixnum(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::boolean(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Value::character(value)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.decode() {
            Decoded::Nothing => write!(f, "#<nothing>"),
            Decoded::Object(header) => match unsafe { self.as_closure() } {
                Some(closure) => write!(f, "#<closure {} {:p}>", closure.name(), header),
                None => write!(f, "#<object {:p}>", header),
            },
            Decoded::Fixnum(i) => write!(f, "{i}"),
            Decoded::Character(c) => write!(f, "#\\{c}"),
            Decoded::Nil => write!(f, "()"),
            Decoded::Boolean(true) => write!(f, "#t"),
            Decoded::Boolean(false) => write!(f, "#f"),
            Decoded::Unbound => write!(f, "#<unbound>"),
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({:#x}: {})", self.0, self)
    }
}
