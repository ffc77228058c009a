use std::fmt::Debug;

use rand::Rng;

/// Number of units a mutator may touch, e.g. characters of a string.
pub trait HasLen {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HasLen for String {
    fn len(&self) -> usize {
        self.chars().count()
    }
}

impl HasLen for Vec<u8> {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }
}

/// Produces one new candidate from an existing input.
pub trait Mutator<I> {
    fn mutate<R: Rng + ?Sized>(&self, rng: &mut R, input: &I) -> I;
}

/// Input types the command line can fuzz out of the box.
pub trait FuzzInput: Clone + Debug + HasLen {
    type Mutator: Mutator<Self> + Default;

    fn from_arg(arg: &str) -> Self;
}

impl FuzzInput for String {
    type Mutator = StringMutator;

    fn from_arg(arg: &str) -> Self {
        arg.to_string()
    }
}

impl FuzzInput for Vec<u8> {
    type Mutator = BytesMutator;

    fn from_arg(arg: &str) -> Self {
        arg.as_bytes().to_vec()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Delete,
    Insert,
    Flip,
}

impl Operator {
    const ALL: [Operator; 3] = [Operator::Delete, Operator::Insert, Operator::Flip];

    fn pick<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

/// Deletes, inserts or flips one character. Inserted characters are printable ASCII, flips
/// toggle one of the lower seven bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringMutator;

impl StringMutator {
    pub fn delete_random_character<R: Rng + ?Sized>(rng: &mut R, s: &str) -> String {
        let mut chars: Vec<char> = s.chars().collect();
        if chars.is_empty() {
            return s.to_string();
        }
        chars.remove(rng.gen_range(0..chars.len()));
        chars.into_iter().collect()
    }

    pub fn insert_random_character<R: Rng + ?Sized>(rng: &mut R, s: &str) -> String {
        let mut chars: Vec<char> = s.chars().collect();
        let pos = rng.gen_range(0..=chars.len());
        chars.insert(pos, char::from(rng.gen_range(32u8..127)));
        chars.into_iter().collect()
    }

    pub fn flip_random_character<R: Rng + ?Sized>(rng: &mut R, s: &str) -> String {
        let mut chars: Vec<char> = s.chars().collect();
        if chars.is_empty() {
            return s.to_string();
        }
        let pos = rng.gen_range(0..chars.len());
        let bit = 1u32 << rng.gen_range(0..7u32);
        if let Some(flipped) = char::from_u32(chars[pos] as u32 ^ bit) {
            chars[pos] = flipped;
        }
        chars.into_iter().collect()
    }
}

impl Mutator<String> for StringMutator {
    fn mutate<R: Rng + ?Sized>(&self, rng: &mut R, input: &String) -> String {
        match Operator::pick(rng) {
            Operator::Delete => Self::delete_random_character(rng, input),
            Operator::Insert => Self::insert_random_character(rng, input),
            Operator::Flip => Self::flip_random_character(rng, input),
        }
    }
}

/// Byte-level counterpart of [`StringMutator`]. Inserted bytes are arbitrary, flips toggle any
/// of the eight bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesMutator;

impl Mutator<Vec<u8>> for BytesMutator {
    fn mutate<R: Rng + ?Sized>(&self, rng: &mut R, input: &Vec<u8>) -> Vec<u8> {
        let mut bytes = input.clone();
        match Operator::pick(rng) {
            Operator::Delete if !bytes.is_empty() => {
                bytes.remove(rng.gen_range(0..bytes.len()));
            }
            Operator::Insert => {
                let pos = rng.gen_range(0..=bytes.len());
                bytes.insert(pos, rng.gen());
            }
            Operator::Flip if !bytes.is_empty() => {
                let pos = rng.gen_range(0..bytes.len());
                bytes[pos] ^= 1u8 << rng.gen_range(0..8u8);
            }
            _ => {}
        }
        bytes
    }
}
