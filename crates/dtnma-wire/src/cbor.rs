//! Binary CBOR encoding of ARIs.
//!
//! Untyped literals are bare CBOR primitives. Typed literals are a 2-element
//! array `[type-code, value]` and references are a 3- or 4-element array
//! `[ns-id, type-id, obj-id, params?]`, where a null type or object id marks
//! an absent segment. Only definite-length items are produced or accepted,
//! CBOR tags are rejected, and AM keys must be untyped.
//!
//! Decoding first measures the extent of one well-formed item, then decodes
//! exactly that slice, so a hostile input can never be read past its end.
//! Nesting depth is bounded by the CBOR reader's recursion limit.

use dtnma_types::{
    Ari, AriMap, ExecSet, IdSeg, LitType, Literal, Nonce, Params, Prim, Reference, Report,
    RptSet, Table, Timespec,
};
use serde::de::{
    self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Unexpected, Visitor,
};
use serde::ser::{self, Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;
use thiserror::Error;

/// Default cap on container pre-allocation from a declared length.
pub const DEFAULT_MAX_PREALLOC: usize = 1024;

/// Codec failures. No partial value is ever returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    /// The value cannot be represented on the wire.
    #[error("ARI encode error: {0}")]
    Encode(String),

    /// The input is not a valid encoded ARI.
    #[error("ARI decode error: {0}")]
    Decode(String),

    /// Bytes remained after the first item.
    #[error("Trailing data after ARI: {0} bytes")]
    TrailingData(usize),

    /// Nothing to decode.
    #[error("Empty input")]
    Empty,
}

/// Alias for Result with CodecError.
pub type CodecResult<T> = Result<T, CodecError>;

/// Encode one ARI.
pub fn encode(ari: &Ari) -> CodecResult<Vec<u8>> {
    serde_cbor::to_vec(&AriSer(ari)).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Append the encoding of one ARI to a buffer.
///
/// On error the buffer may hold a partial item and should be discarded.
pub fn encode_into(ari: &Ari, out: &mut Vec<u8>) -> CodecResult<()> {
    serde_cbor::to_writer(out, &AriSer(ari)).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode a buffer holding exactly one ARI.
pub fn decode(buf: &[u8]) -> CodecResult<Ari> {
    let (ari, used) = decode_prefix(buf)?;
    if used < buf.len() {
        return Err(CodecError::TrailingData(buf.len() - used));
    }
    Ok(ari)
}

/// Decode the first ARI in a buffer, returning it with the bytes consumed.
pub fn decode_prefix(buf: &[u8]) -> CodecResult<(Ari, usize)> {
    decode_prefix_with(buf, DEFAULT_MAX_PREALLOC)
}

/// [`decode_prefix`] with an explicit pre-allocation cap.
pub fn decode_prefix_with(buf: &[u8], max_prealloc: usize) -> CodecResult<(Ari, usize)> {
    let used = item_extent(buf)?;
    let mut de = serde_cbor::Deserializer::from_slice(&buf[..used]);
    let ari = AriSeed(Ctx { max_prealloc })
        .deserialize(&mut de)
        .map_err(decode_err)?;
    de.end().map_err(decode_err)?;
    Ok((ari, used))
}

/// Length of the first well-formed CBOR item in `buf`.
fn item_extent(buf: &[u8]) -> CodecResult<usize> {
    if buf.is_empty() {
        return Err(CodecError::Empty);
    }
    let mut items = serde_cbor::Deserializer::from_slice(buf).into_iter::<IgnoredAny>();
    match items.next() {
        Some(Ok(_)) => {
            let used = items.byte_offset();
            check_definite(&buf[..used])?;
            Ok(used)
        }
        Some(Err(e)) => Err(decode_err(e)),
        None => Err(CodecError::Empty),
    }
}

/// Reject indefinite lengths and tags anywhere in one well-formed item.
///
/// The CBOR reader joins chunked strings before any visitor sees them, so
/// this walks the raw headers.
fn check_definite(item: &[u8]) -> CodecResult<()> {
    let malformed = || CodecError::Decode("malformed CBOR header".to_string());
    let mut pos = 0usize;
    let mut pending = 1u64;
    while pending > 0 {
        pending -= 1;
        let initial = *item.get(pos).ok_or_else(malformed)?;
        pos += 1;
        let info = initial & 0x1F;
        let arg = match info {
            0..=23 => u64::from(info),
            24..=27 => {
                let width = 1usize << (info - 24);
                let bytes = item.get(pos..pos + width).ok_or_else(malformed)?;
                pos += width;
                bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
            }
            31 => {
                return Err(CodecError::Decode(
                    "indefinite-length items are not supported".to_string(),
                ))
            }
            _ => return Err(malformed()),
        };
        match initial >> 5 {
            2 | 3 => {
                pos = usize::try_from(arg)
                    .ok()
                    .and_then(|len| pos.checked_add(len))
                    .filter(|end| *end <= item.len())
                    .ok_or_else(malformed)?;
            }
            4 => pending = pending.saturating_add(arg),
            5 => pending = pending.saturating_add(arg.saturating_mul(2)),
            6 => return Err(CodecError::Decode("CBOR tags are not supported".to_string())),
            _ => {}
        }
    }
    Ok(())
}

/// Map keys are untyped primitives or references.
fn is_valid_key(key: &Ari) -> bool {
    !matches!(key, Ari::Lit(lit) if lit.lit_type().is_some())
}

fn decode_err(e: serde_cbor::Error) -> CodecError {
    CodecError::Decode(e.to_string())
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

struct AriSer<'a>(&'a Ari);

impl Serialize for AriSer<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Ari::Lit(lit) => LitSer(lit).serialize(s),
            Ari::Ref(r) => RefSer(r).serialize(s),
        }
    }
}

struct RefSer<'a>(&'a Reference);

impl Serialize for RefSer<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let r = self.0;
        let len = if matches!(r.params, Params::None) { 3 } else { 4 };
        if r.ns_id.is_absent() {
            return Err(ser::Error::custom("reference without a namespace"));
        }
        let mut seq = s.serialize_seq(Some(len))?;
        seq.serialize_element(&IdSegSer(&r.ns_id))?;
        seq.serialize_element(&IdSegSer(&r.type_id))?;
        seq.serialize_element(&IdSegSer(&r.obj_id))?;
        match &r.params {
            Params::None => {}
            Params::Ac(items) => seq.serialize_element(&ListSer(items))?,
            Params::Am(map) => seq.serialize_element(&MapSer(map))?,
        }
        seq.end()
    }
}

struct IdSegSer<'a>(&'a IdSeg);

impl Serialize for IdSegSer<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            IdSeg::Absent => s.serialize_unit(),
            IdSeg::Int(v) => s.serialize_i64(*v),
            IdSeg::Text(v) => s.serialize_str(v),
        }
    }
}

struct PrimSer<'a>(&'a Prim);

impl Serialize for PrimSer<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Prim::Null => s.serialize_unit(),
            Prim::Bool(v) => s.serialize_bool(*v),
            Prim::Int(v) => s.serialize_i64(*v),
            Prim::UInt(v) => s.serialize_u64(*v),
            Prim::Float(v) => s.serialize_f64(*v),
            Prim::Text(v) => s.serialize_str(v),
            Prim::Bytes(v) => s.serialize_bytes(v),
        }
    }
}

struct TimeSer<'a>(&'a Timespec);

impl Serialize for TimeSer<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let ts = self.0;
        if ts.nanos() == 0 {
            return s.serialize_i64(ts.secs());
        }
        let (exp, mantissa) = ts
            .to_decimal()
            .ok_or_else(|| <S::Error as ser::Error>::custom("time value mantissa exceeds 64 bits"))?;
        let mut seq = s.serialize_seq(Some(2))?;
        seq.serialize_element(&exp)?;
        seq.serialize_element(&mantissa)?;
        seq.end()
    }
}

struct ListSer<'a>(&'a [Ari]);

impl Serialize for ListSer<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(self.0.len()))?;
        for item in self.0 {
            seq.serialize_element(&AriSer(item))?;
        }
        seq.end()
    }
}

struct MapSer<'a>(&'a AriMap);

impl Serialize for MapSer<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0 {
            if !is_valid_key(key) {
                return Err(ser::Error::custom("map keys must be untyped"));
            }
            map.serialize_entry(&AriSer(key), &AriSer(value))?;
        }
        map.end()
    }
}

/// Leading elements of a container array, ahead of its ARI items.
enum Head<'a> {
    Count(u64),
    Ari(&'a Ari),
    Time(&'a Timespec),
}

impl Serialize for Head<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Count(n) => s.serialize_u64(*n),
            Self::Ari(a) => AriSer(a).serialize(s),
            Self::Time(t) => TimeSer(t).serialize(s),
        }
    }
}

fn serialize_headed<S: Serializer>(s: S, head: &[Head<'_>], items: &[Ari]) -> Result<S::Ok, S::Error> {
    let mut seq = s.serialize_seq(Some(head.len() + items.len()))?;
    for h in head {
        seq.serialize_element(h)?;
    }
    for item in items {
        seq.serialize_element(&AriSer(item))?;
    }
    seq.end()
}

struct TableSer<'a>(&'a Table);

impl Serialize for TableSer<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        serialize_headed(s, &[Head::Count(self.0.ncols() as u64)], self.0.items())
    }
}

struct ExecSetSer<'a>(&'a ExecSet);

impl Serialize for ExecSetSer<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let nonce = self.0.nonce.to_ari();
        serialize_headed(s, &[Head::Ari(&nonce)], &self.0.targets)
    }
}

struct ReportSer<'a>(&'a Report);

impl Serialize for ReportSer<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let rpt = self.0;
        serialize_headed(
            s,
            &[Head::Time(&rpt.rel_time), Head::Ari(&rpt.source)],
            &rpt.items,
        )
    }
}

struct RptSetSer<'a>(&'a RptSet);

impl Serialize for RptSetSer<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let set = self.0;
        let nonce = set.nonce.to_ari();
        let mut seq = s.serialize_seq(Some(2 + set.reports.len()))?;
        seq.serialize_element(&AriSer(&nonce))?;
        seq.serialize_element(&TimeSer(&set.ref_time))?;
        for rpt in &set.reports {
            seq.serialize_element(&ReportSer(rpt))?;
        }
        seq.end()
    }
}

struct LitSer<'a>(&'a Literal);

impl Serialize for LitSer<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let lit = self.0;
        let ty = match lit.lit_type() {
            Some(ty) => ty,
            None => {
                return match lit.prim() {
                    Some(prim) => PrimSer(prim).serialize(s),
                    None => Err(ser::Error::custom("untyped literal without a value")),
                }
            }
        };

        let mut seq = s.serialize_seq(Some(2))?;
        seq.serialize_element(&ty.code())?;
        match lit {
            Literal::Untyped(_) => {}
            Literal::Typed(ty, prim) => {
                if !ty.admits(prim) {
                    return Err(ser::Error::custom(format!(
                        "value does not fit literal type {ty}"
                    )));
                }
                seq.serialize_element(&PrimSer(prim))?;
            }
            Literal::Tp(ts) | Literal::Td(ts) => seq.serialize_element(&TimeSer(ts))?,
            Literal::Ac(items) => seq.serialize_element(&ListSer(items))?,
            Literal::Am(map) => seq.serialize_element(&MapSer(map))?,
            Literal::Tbl(tbl) => seq.serialize_element(&TableSer(tbl))?,
            Literal::ExecSet(set) => seq.serialize_element(&ExecSetSer(set))?,
            Literal::RptSet(set) => seq.serialize_element(&RptSetSer(set))?,
        }
        seq.end()
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Ctx {
    max_prealloc: usize,
}

impl Ctx {
    fn capacity(&self, hint: Option<usize>) -> usize {
        hint.unwrap_or(0).min(self.max_prealloc)
    }
}

fn uint_prim(v: u64) -> Prim {
    i64::try_from(v).map(Prim::Int).unwrap_or(Prim::UInt(v))
}

fn definite<E: de::Error>(hint: Option<usize>) -> Result<usize, E> {
    hint.ok_or_else(|| E::custom("indefinite-length items are not supported"))
}

fn required<'de, A, T>(seq: &mut A, seed: T, index: usize, exp: &dyn de::Expected) -> Result<T::Value, A::Error>
where
    A: SeqAccess<'de>,
    T: DeserializeSeed<'de>,
{
    seq.next_element_seed(seed)?
        .ok_or_else(|| de::Error::invalid_length(index, exp))
}

fn collect_aris<'de, A: SeqAccess<'de>>(
    ctx: Ctx,
    seq: &mut A,
    remaining: usize,
) -> Result<Vec<Ari>, A::Error> {
    let mut items = Vec::with_capacity(ctx.capacity(Some(remaining)));
    while let Some(item) = seq.next_element_seed(AriSeed(ctx))? {
        items.push(item);
    }
    Ok(items)
}

struct AriSeed(Ctx);

impl<'de> DeserializeSeed<'de> for AriSeed {
    type Value = Ari;

    fn deserialize<D: Deserializer<'de>>(self, d: D) -> Result<Ari, D::Error> {
        d.deserialize_any(AriVisitor(self.0))
    }
}

struct AriVisitor(Ctx);

impl<'de> Visitor<'de> for AriVisitor {
    type Value = Ari;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an ARI")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Ari, E> {
        Ok(Ari::null())
    }

    fn visit_none<E: de::Error>(self) -> Result<Ari, E> {
        Ok(Ari::null())
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Ari, E> {
        Ok(Ari::bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Ari, E> {
        Ok(Ari::int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Ari, E> {
        Ok(Ari::Lit(Literal::Untyped(uint_prim(v))))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Ari, E> {
        Ok(Ari::float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Ari, E> {
        Ok(Ari::text(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Ari, E> {
        Ok(Ari::bytes(v))
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(self, _d: D) -> Result<Ari, D::Error> {
        Err(de::Error::custom("CBOR tags are not supported"))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Ari, A::Error> {
        let ctx = self.0;
        match definite::<A::Error>(seq.size_hint())? {
            2 => {
                let code: i64 = required(&mut seq, std::marker::PhantomData, 0, &self)?;
                let ty = LitType::from_code(code).ok_or_else(|| {
                    <A::Error as de::Error>::invalid_value(
                        Unexpected::Signed(code),
                        &"a literal type code",
                    )
                })?;
                let lit = required(&mut seq, TypedSeed { ty, ctx }, 1, &self)?;
                Ok(Ari::Lit(lit))
            }
            len @ (3 | 4) => {
                let ns_id = required(&mut seq, IdSegSeed { optional: false }, 0, &self)?;
                let type_id = required(&mut seq, IdSegSeed { optional: true }, 1, &self)?;
                let obj_id = required(&mut seq, IdSegSeed { optional: true }, 2, &self)?;
                let params = if len == 4 {
                    required(&mut seq, ParamsSeed(ctx), 3, &self)?
                } else {
                    Params::None
                };
                Ok(Ari::Ref(Reference {
                    ns_id,
                    type_id,
                    obj_id,
                    params,
                }))
            }
            len => Err(de::Error::invalid_length(len, &self)),
        }
    }
}

struct IdSegSeed {
    /// Whether null decodes to [`IdSeg::Absent`].
    optional: bool,
}

impl<'de> DeserializeSeed<'de> for IdSegSeed {
    type Value = IdSeg;

    fn deserialize<D: Deserializer<'de>>(self, d: D) -> Result<IdSeg, D::Error> {
        d.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for IdSegSeed {
    type Value = IdSeg;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an integer or text identifier")
    }

    fn visit_unit<E: de::Error>(self) -> Result<IdSeg, E> {
        if self.optional {
            Ok(IdSeg::Absent)
        } else {
            Err(E::invalid_type(Unexpected::Unit, &self))
        }
    }

    fn visit_none<E: de::Error>(self) -> Result<IdSeg, E> {
        self.visit_unit()
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<IdSeg, E> {
        Ok(IdSeg::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<IdSeg, E> {
        i64::try_from(v)
            .map(IdSeg::Int)
            .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<IdSeg, E> {
        Ok(IdSeg::Text(v.to_string()))
    }
}

struct ParamsSeed(Ctx);

impl<'de> DeserializeSeed<'de> for ParamsSeed {
    type Value = Params;

    fn deserialize<D: Deserializer<'de>>(self, d: D) -> Result<Params, D::Error> {
        d.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for ParamsSeed {
    type Value = Params;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a parameter array or map")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Params, A::Error> {
        ListVisitor(self.0).visit_seq(seq).map(Params::Ac)
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Params, A::Error> {
        MapVisitor(self.0).visit_map(map).map(Params::Am)
    }
}

struct PrimVisitor;

impl<'de> Visitor<'de> for PrimVisitor {
    type Value = Prim;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a primitive value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Prim, E> {
        Ok(Prim::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Prim, E> {
        Ok(Prim::Null)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Prim, E> {
        Ok(Prim::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Prim, E> {
        Ok(Prim::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Prim, E> {
        Ok(uint_prim(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Prim, E> {
        Ok(Prim::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Prim, E> {
        Ok(Prim::Text(v.to_string()))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Prim, E> {
        Ok(Prim::Bytes(v.to_vec()))
    }
}

/// The value half of a typed literal.
struct TypedSeed {
    ty: LitType,
    ctx: Ctx,
}

impl<'de> DeserializeSeed<'de> for TypedSeed {
    type Value = Literal;

    fn deserialize<D: Deserializer<'de>>(self, d: D) -> Result<Literal, D::Error> {
        let ctx = self.ctx;
        match self.ty {
            LitType::Tp => TimeSeed.deserialize(d).map(Literal::Tp),
            LitType::Td => TimeSeed.deserialize(d).map(Literal::Td),
            LitType::Ac => d.deserialize_any(ListVisitor(ctx)).map(Literal::Ac),
            LitType::Am => d.deserialize_any(MapVisitor(ctx)).map(Literal::Am),
            LitType::Tbl => d.deserialize_any(TableVisitor(ctx)).map(Literal::Tbl),
            LitType::ExecSet => d.deserialize_any(ExecSetVisitor(ctx)).map(Literal::ExecSet),
            LitType::RptSet => d.deserialize_any(RptSetVisitor(ctx)).map(Literal::RptSet),
            ty => {
                let prim = d.deserialize_any(PrimVisitor)?;
                if ty.admits(&prim) {
                    Ok(Literal::Typed(ty, prim))
                } else {
                    Err(de::Error::custom(format!(
                        "value does not fit literal type {ty}"
                    )))
                }
            }
        }
    }
}

struct TimeSeed;

impl<'de> DeserializeSeed<'de> for TimeSeed {
    type Value = Timespec;

    fn deserialize<D: Deserializer<'de>>(self, d: D) -> Result<Timespec, D::Error> {
        d.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for TimeSeed {
    type Value = Timespec;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("integer seconds or a decimal fraction [exp, mantissa]")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Timespec, E> {
        Ok(Timespec::from_secs(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Timespec, E> {
        i64::try_from(v)
            .map(Timespec::from_secs)
            .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Timespec, A::Error> {
        let len = definite::<A::Error>(seq.size_hint())?;
        if len != 2 {
            return Err(de::Error::invalid_length(len, &self));
        }
        let exp: i64 = required(&mut seq, std::marker::PhantomData, 0, &self)?;
        let mantissa: i64 = required(&mut seq, std::marker::PhantomData, 1, &self)?;
        Timespec::from_decimal(exp, mantissa).ok_or_else(|| {
            de::Error::invalid_value(Unexpected::Signed(exp), &"an exponent in -9..=9")
        })
    }
}

struct ListVisitor(Ctx);

impl<'de> Visitor<'de> for ListVisitor {
    type Value = Vec<Ari>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an array of ARIs")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<Ari>, A::Error> {
        let len = definite::<A::Error>(seq.size_hint())?;
        collect_aris(self.0, &mut seq, len)
    }
}

struct MapVisitor(Ctx);

impl<'de> Visitor<'de> for MapVisitor {
    type Value = AriMap;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of ARIs")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<AriMap, A::Error> {
        definite::<A::Error>(access.size_hint())?;
        let mut map = AriMap::new();
        while let Some(key) = access.next_key_seed(AriSeed(self.0))? {
            if !is_valid_key(&key) {
                return Err(de::Error::custom("map keys must be untyped"));
            }
            let value = access.next_value_seed(AriSeed(self.0))?;
            if map.insert(key, value).is_some() {
                return Err(de::Error::custom("duplicate map key"));
            }
        }
        Ok(map)
    }
}

struct TableVisitor(Ctx);

impl<'de> Visitor<'de> for TableVisitor {
    type Value = Table;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a table [ncols, item...]")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Table, A::Error> {
        let len = definite::<A::Error>(seq.size_hint())?;
        let ncols: u64 = required(&mut seq, std::marker::PhantomData, 0, &self)?;
        let ncols = usize::try_from(ncols)
            .map_err(|_| <A::Error as de::Error>::invalid_value(Unexpected::Unsigned(ncols), &self))?;
        let items = collect_aris(self.0, &mut seq, len.saturating_sub(1))?;
        Table::from_items(ncols, items).map_err(de::Error::custom)
    }
}

struct ExecSetVisitor(Ctx);

impl<'de> Visitor<'de> for ExecSetVisitor {
    type Value = ExecSet;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an execution set [nonce, target...]")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<ExecSet, A::Error> {
        let len = definite::<A::Error>(seq.size_hint())?;
        let nonce = required(&mut seq, AriSeed(self.0), 0, &self)?;
        let nonce = Nonce::from_ari(&nonce).map_err(<A::Error as de::Error>::custom)?;
        let targets = collect_aris(self.0, &mut seq, len.saturating_sub(1))?;
        Ok(ExecSet { nonce, targets })
    }
}

struct ReportSeed(Ctx);

impl<'de> DeserializeSeed<'de> for ReportSeed {
    type Value = Report;

    fn deserialize<D: Deserializer<'de>>(self, d: D) -> Result<Report, D::Error> {
        d.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for ReportSeed {
    type Value = Report;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a report [rel-time, source, item...]")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Report, A::Error> {
        let len = definite::<A::Error>(seq.size_hint())?;
        let rel_time = required(&mut seq, TimeSeed, 0, &self)?;
        let source = required(&mut seq, AriSeed(self.0), 1, &self)?;
        let items = collect_aris(self.0, &mut seq, len.saturating_sub(2))?;
        Ok(Report {
            rel_time,
            source,
            items,
        })
    }
}

struct RptSetVisitor(Ctx);

impl<'de> Visitor<'de> for RptSetVisitor {
    type Value = RptSet;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a report set [nonce, ref-time, report...]")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<RptSet, A::Error> {
        let len = definite::<A::Error>(seq.size_hint())?;
        let nonce = required(&mut seq, AriSeed(self.0), 0, &self)?;
        let nonce = Nonce::from_ari(&nonce).map_err(<A::Error as de::Error>::custom)?;
        let ref_time = required(&mut seq, TimeSeed, 1, &self)?;
        let mut reports = Vec::with_capacity(self.0.capacity(Some(len.saturating_sub(2))));
        while let Some(rpt) = seq.next_element_seed(ReportSeed(self.0))? {
            reports.push(rpt);
        }
        Ok(RptSet {
            nonce,
            ref_time,
            reports,
        })
    }
}
