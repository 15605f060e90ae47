//! Raw `serde_json`-driven view of a schema JSON document
//!
//! This only distinguishes the three node shapes (type string or reference,
//! object, union array) and collects the attributes this library honors.
//! Interpretation happens in the parent module.

use serde::de::*;

pub(super) enum RawNode<'a> {
	Type(Type),
	Ref(std::borrow::Cow<'a, str>),
	Object(Box<RawObject<'a>>),
	Union(Vec<RawNode<'a>>),
}

#[derive(serde_derive::Deserialize, Clone, Copy, Debug)]
#[serde(rename_all = "kebab-case")]
pub(super) enum Type {
	// Primitive types
	Null,
	Boolean,
	Int,
	Long,
	Float,
	Double,
	Bytes,
	String,
	// Complex types
	Array,
	Map,
	Record,
	Enum,
	Fixed,
}

#[derive(serde_derive::Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound = "'a: 'de, 'de: 'a")]
pub(super) struct RawObject<'a> {
	/// With a logical type this can be a primitive type name or a nested
	/// object, otherwise it should name a complex type
	#[serde(rename = "type")]
	pub(super) type_: RawNode<'a>,
	pub(super) logical_type: Option<CowStr<'a>>,
	/// For named types
	pub(super) name: Option<CowStr<'a>>,
	/// For named types
	pub(super) namespace: Option<CowStr<'a>>,
	/// For named types
	pub(super) aliases: Option<Vec<CowStr<'a>>>,
	/// For record and enum types
	pub(super) doc: Option<CowStr<'a>>,
	/// For record type
	pub(super) fields: Option<Vec<RawField<'a>>>,
	/// For enum type
	pub(super) symbols: Option<Vec<CowStr<'a>>>,
	/// For array type
	pub(super) items: Option<RawNode<'a>>,
	/// For map type
	pub(super) values: Option<RawNode<'a>>,
	/// For fixed type
	pub(super) size: Option<usize>,
	/// For decimal logical type
	pub(super) precision: Option<usize>,
	/// For decimal logical type
	pub(super) scale: Option<u32>,
}

impl RawObject<'_> {
	/// Whether any structural attribute is set
	///
	/// Used to check that nothing meaningful gets silently dropped when
	/// unwrapping `{"type": {"type": "string"}}`-style nesting. (A `name`
	/// or `namespace` on such a wrapper is tolerated, as some writers emit
	/// field-like wrappers around plain types.)
	pub(super) fn has_structural_attributes(&self) -> bool {
		self.fields.is_some()
			|| self.symbols.is_some()
			|| self.items.is_some()
			|| self.values.is_some()
			|| self.size.is_some()
			|| self.precision.is_some()
			|| self.scale.is_some()
	}
}

#[derive(serde_derive::Deserialize)]
#[serde(bound = "'a: 'de")]
pub(super) struct RawField<'a> {
	#[serde(borrow)]
	pub(super) name: CowStr<'a>,
	pub(super) doc: Option<CowStr<'a>>,
	#[serde(rename = "type")]
	pub(super) type_: RawNode<'a>,
	pub(super) default: Option<serde_json::Value>,
}

#[derive(serde_derive::Deserialize)]
pub(super) struct CowStr<'a>(#[serde(borrow)] pub(super) std::borrow::Cow<'a, str>);

impl<'de> Deserialize<'de> for RawNode<'de> {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		struct RawNodeVisitor<'de>(std::marker::PhantomData<&'de ()>);
		impl<'de> Visitor<'de> for RawNodeVisitor<'de> {
			type Value = RawNode<'de>;

			fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
				write!(
					formatter,
					"a string (type name or reference), an object with a `type` field, \
						or an array (union)"
				)
			}

			fn visit_map<A>(self, map: A) -> Result<Self::Value, A::Error>
			where
				A: MapAccess<'de>,
			{
				Ok(RawNode::Object(Deserialize::deserialize(
					serde::de::value::MapAccessDeserializer::new(map),
				)?))
			}

			fn visit_seq<A>(self, seq: A) -> Result<Self::Value, A::Error>
			where
				A: SeqAccess<'de>,
			{
				Ok(RawNode::Union(Deserialize::deserialize(
					serde::de::value::SeqAccessDeserializer::new(seq),
				)?))
			}

			fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
			where
				E: Error,
			{
				Ok(match parse_type(v) {
					Some(type_) => RawNode::Type(type_),
					None => RawNode::Ref(v.to_owned().into()),
				})
			}

			fn visit_borrowed_str<E>(self, v: &'de str) -> Result<Self::Value, E>
			where
				E: Error,
			{
				Ok(match parse_type(v) {
					Some(type_) => RawNode::Type(type_),
					None => RawNode::Ref(v.into()),
				})
			}

			fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
			where
				E: Error,
			{
				Ok(match parse_type(&v) {
					Some(type_) => RawNode::Type(type_),
					None => RawNode::Ref(v.into()),
				})
			}
		}
		deserializer.deserialize_any(RawNodeVisitor(std::marker::PhantomData))
	}
}

fn parse_type(v: &str) -> Option<Type> {
	Type::deserialize(serde::de::value::StrDeserializer::<FailedDeserialization>::new(v)).ok()
}

#[derive(thiserror::Error, Debug)]
#[error("Failed to deserialize")]
struct FailedDeserialization;
impl Error for FailedDeserialization {
	fn custom<T: std::fmt::Display>(_msg: T) -> Self {
		FailedDeserialization
	}
}
