#![allow(dead_code)]

use chrono::{DateTime, Utc};
use shapegen::runtime::RequestParts;

/// 2023-11-14T22:13:20Z
pub fn timestamp() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

pub fn body(parts: &RequestParts) -> &str {
    parts.body_str().unwrap()
}

pub const QUERY_MODEL: &str = r#"{
    "metadata": { "apiVersion": "2010-03-31", "protocol": "query", "serviceId": "SNS" },
    "operations": {
        "CreateTopic": {
            "name": "CreateTopic",
            "http": { "method": "POST", "requestUri": "/" },
            "input": { "shape": "CreateTopicInput" },
            "output": { "shape": "CreateTopicResponse", "resultWrapper": "CreateTopicResult" }
        },
        "ListThings": {
            "name": "ListThings",
            "http": { "method": "POST", "requestUri": "/" },
            "input": { "shape": "ListThingsInput" }
        },
        "SetMatrix": {
            "name": "SetMatrix",
            "http": { "method": "POST", "requestUri": "/" },
            "input": { "shape": "SetMatrixInput" }
        },
        "SetAttributes": {
            "name": "SetAttributes",
            "http": { "method": "POST", "requestUri": "/" },
            "input": { "shape": "SetAttributesInput" }
        },
        "Describe": {
            "name": "Describe",
            "http": { "method": "POST", "requestUri": "/" },
            "input": { "shape": "DescribeInput" }
        }
    },
    "shapes": {
        "CreateTopicInput": {
            "type": "structure",
            "required": ["Name"],
            "members": {
                "Name": { "shape": "topicName" },
                "Attributes": { "shape": "TopicAttributesMap" },
                "Tags": { "shape": "TagList" },
                "Enabled": { "shape": "flag" },
                "At": { "shape": "stamp" },
                "Labels": { "shape": "StringList" }
            }
        },
        "CreateTopicResponse": {
            "type": "structure",
            "required": ["Count"],
            "members": {
                "TopicArn": { "shape": "topicARN" },
                "Tags": { "shape": "TagList" },
                "Count": { "shape": "count" }
            }
        },
        "ListThingsInput": {
            "type": "structure",
            "members": { "ItemList": { "shape": "FlatList", "locationName": "Items" } }
        },
        "SetMatrixInput": {
            "type": "structure",
            "members": { "Matrix": { "shape": "Matrix" }, "Flags": { "shape": "StringList" } }
        },
        "SetAttributesInput": {
            "type": "structure",
            "members": { "Attrs": { "shape": "UnnamedKeyMap" } }
        },
        "DescribeInput": {
            "type": "structure",
            "members": { "Detail": { "shape": "doc" } }
        },
        "FlatList": {
            "type": "list",
            "flattened": true,
            "member": { "shape": "topicName", "locationName": "Item" }
        },
        "Matrix": { "type": "list", "member": { "shape": "StringList" } },
        "StringList": { "type": "list", "member": { "shape": "topicName" } },
        "TagList": { "type": "list", "member": { "shape": "Tag" } },
        "Tag": {
            "type": "structure",
            "required": ["Key", "Value"],
            "members": { "Key": { "shape": "topicName" }, "Value": { "shape": "topicName" } }
        },
        "TopicAttributesMap": {
            "type": "map",
            "key": { "shape": "topicName", "locationName": "key" },
            "value": { "shape": "topicName", "locationName": "value" }
        },
        "UnnamedKeyMap": {
            "type": "map",
            "key": { "shape": "topicName" },
            "value": { "shape": "topicName" }
        },
        "topicName": { "type": "string" },
        "topicARN": { "type": "string" },
        "flag": { "type": "boolean" },
        "count": { "type": "integer" },
        "stamp": { "type": "timestamp" },
        "doc": { "type": "document" }
    }
}"#;

pub const REST_JSON_MODEL: &str = r#"{
    "metadata": { "apiVersion": "2020-01-01", "protocol": "rest-json", "serviceId": "Things" },
    "operations": {
        "EchoThing": {
            "name": "EchoThing",
            "http": { "method": "POST", "requestUri": "/echo" },
            "input": { "shape": "Thing" },
            "output": { "shape": "Thing" }
        },
        "PutThing": {
            "name": "PutThing",
            "http": { "method": "POST", "requestUri": "/things/{Id}" },
            "input": { "shape": "PutThingInput" },
            "output": { "shape": "PutThingOutput" }
        },
        "Upload": {
            "name": "Upload",
            "http": { "method": "PUT", "requestUri": "/upload" },
            "input": { "shape": "UploadInput" }
        },
        "PutMap": {
            "name": "PutMap",
            "http": { "method": "POST", "requestUri": "/map" },
            "input": { "shape": "LabelsHolder" }
        },
        "GetLabels": {
            "name": "GetLabels",
            "http": { "method": "GET", "requestUri": "/labels" },
            "output": { "shape": "LabelsHolder" }
        },
        "GetBadLabels": {
            "name": "GetBadLabels",
            "http": { "method": "GET", "requestUri": "/bad" },
            "output": { "shape": "BadLabelsHolder" }
        },
        "PlantTree": {
            "name": "PlantTree",
            "http": { "method": "POST", "requestUri": "/tree" },
            "input": { "shape": "TreeInput" }
        },
        "ListItems": {
            "name": "ListItems",
            "http": { "method": "GET", "requestUri": "/items" },
            "output": { "shape": "ListItemsOutput" }
        },
        "ListNames": {
            "name": "ListNames",
            "http": { "method": "GET", "requestUri": "/names" },
            "output": { "shape": "ListNamesOutput" }
        },
        "PutTags": {
            "name": "PutTags",
            "http": { "method": "POST", "requestUri": "/tags" },
            "input": { "shape": "PutTagsInput" }
        },
        "GetTags": {
            "name": "GetTags",
            "http": { "method": "GET", "requestUri": "/tags" },
            "output": { "shape": "GetTagsOutput" }
        }
    },
    "shapes": {
        "Thing": {
            "type": "structure",
            "required": ["Name"],
            "members": {
                "Name": { "shape": "str" },
                "Count": { "shape": "int" },
                "Enabled": { "shape": "bool" },
                "Ratio": { "shape": "dbl" },
                "Weight": { "shape": "flt" },
                "Created": { "shape": "ts" },
                "Data": { "shape": "bin" },
                "Tags": { "shape": "StringList" },
                "Config": { "shape": "Config" },
                "Configs": { "shape": "ConfigList" }
            }
        },
        "Config": {
            "type": "structure",
            "members": { "Mode": { "shape": "str" }, "Limit": { "shape": "int" } }
        },
        "ConfigList": { "type": "list", "member": { "shape": "Config" } },
        "StringList": { "type": "list", "member": { "shape": "str" } },
        "PutThingInput": {
            "type": "structure",
            "required": ["Id"],
            "members": {
                "Id": { "shape": "str", "location": "uri", "locationName": "Id" },
                "Token": { "shape": "str", "location": "header", "locationName": "X-Token" },
                "Verbose": { "shape": "bool", "location": "querystring", "locationName": "verbose" },
                "Since": { "shape": "ts", "location": "header", "locationName": "If-Modified-Since" },
                "Filter": { "shape": "StringList", "location": "querystring", "locationName": "filter" },
                "Meta": { "shape": "StringMap", "location": "headers", "locationName": "x-meta-" },
                "Name": { "shape": "str" }
            }
        },
        "PutThingOutput": {
            "type": "structure",
            "members": {
                "RequestId": { "shape": "str", "location": "header", "locationName": "x-request-id" },
                "Status": { "shape": "int", "location": "statusCode" },
                "Meta": { "shape": "StringMap", "location": "headers", "locationName": "x-meta-" },
                "Name": { "shape": "str" }
            }
        },
        "UploadInput": {
            "type": "structure",
            "payload": "Body",
            "members": {
                "Body": { "shape": "bin" },
                "ContentType": { "shape": "str", "location": "header", "locationName": "Content-Type" }
            }
        },
        "LabelsHolder": {
            "type": "structure",
            "members": { "Labels": { "shape": "LabelMap" } }
        },
        "BadLabelsHolder": {
            "type": "structure",
            "members": { "Labels": { "shape": "StringMap" } }
        },
        "LabelMap": {
            "type": "map",
            "key": { "shape": "str", "locationName": "Key" },
            "value": { "shape": "str", "locationName": "Value" }
        },
        "StringMap": { "type": "map", "key": { "shape": "str" }, "value": { "shape": "str" } },
        "TreeInput": {
            "type": "structure",
            "members": { "Root": { "shape": "Node" } }
        },
        "Node": {
            "type": "structure",
            "members": { "Value": { "shape": "str" }, "Children": { "shape": "NodeList" } }
        },
        "NodeList": { "type": "list", "member": { "shape": "Node" } },
        "ListItemsOutput": {
            "type": "structure",
            "members": { "items": { "shape": "ItemList" } }
        },
        "ItemList": { "type": "list", "member": { "shape": "Item" } },
        "Item": { "type": "structure", "members": { "id": { "shape": "str" } } },
        "ListNamesOutput": {
            "type": "structure",
            "members": { "items": { "shape": "StringList" } }
        },
        "PutTagsInput": {
            "type": "structure",
            "members": { "Tags": { "shape": "TagList" } }
        },
        "GetTagsOutput": {
            "type": "structure",
            "members": { "Tags": { "shape": "TagList" } }
        },
        "TagList": { "type": "list", "member": { "shape": "Tag" } },
        "Tag": {
            "type": "structure",
            "required": ["Key"],
            "members": { "Key": { "shape": "str" }, "Value": { "shape": "str" } }
        },
        "str": { "type": "string" },
        "int": { "type": "integer" },
        "bool": { "type": "boolean" },
        "flt": { "type": "float" },
        "dbl": { "type": "double" },
        "ts": { "type": "timestamp" },
        "bin": { "type": "blob" }
    }
}"#;

pub const REST_XML_MODEL: &str = r#"{
    "metadata": { "apiVersion": "2006-03-01", "protocol": "rest-xml", "serviceId": "S3" },
    "operations": {
        "Echo": {
            "name": "Echo",
            "http": { "method": "POST", "requestUri": "/echo" },
            "input": { "shape": "Doc" },
            "output": { "shape": "Doc" }
        },
        "PutConfig": {
            "name": "PutConfig",
            "http": { "method": "PUT", "requestUri": "/{Bucket}?config" },
            "input": { "shape": "PutConfigInput" }
        },
        "GetObject": {
            "name": "GetObject",
            "http": { "method": "GET", "requestUri": "/{Bucket}/{Key+}" },
            "input": { "shape": "GetObjectInput" },
            "output": { "shape": "GetObjectOutput" }
        },
        "CountThings": {
            "name": "CountThings",
            "http": { "method": "GET", "requestUri": "/count" },
            "output": { "shape": "CountOutput" }
        },
        "MaybeCount": {
            "name": "MaybeCount",
            "http": { "method": "GET", "requestUri": "/maybe" },
            "output": { "shape": "MaybeCountOutput" }
        }
    },
    "shapes": {
        "Doc": {
            "type": "structure",
            "required": ["Name"],
            "members": {
                "Lang": { "shape": "str", "locationName": "xml:lang", "xmlAttribute": true },
                "Name": { "shape": "str" },
                "Size": { "shape": "int" },
                "Active": { "shape": "bool" },
                "Rules": { "shape": "RuleList" },
                "Tags": { "shape": "TagList" },
                "Labels": { "shape": "LabelMap" }
            }
        },
        "Rule": {
            "type": "structure",
            "required": ["Id"],
            "members": { "Id": { "shape": "str" }, "Priority": { "shape": "int" } }
        },
        "RuleList": { "type": "list", "member": { "shape": "Rule", "locationName": "Rule" } },
        "TagList": {
            "type": "list",
            "flattened": true,
            "member": { "shape": "str", "locationName": "Tag" }
        },
        "LabelMap": { "type": "map", "key": { "shape": "str" }, "value": { "shape": "str" } },
        "PutConfigInput": {
            "type": "structure",
            "required": ["Bucket"],
            "payload": "Config",
            "members": {
                "Bucket": { "shape": "str", "location": "uri", "locationName": "Bucket" },
                "Config": { "shape": "BucketConfig", "locationName": "BucketConfiguration" }
            }
        },
        "BucketConfig": {
            "type": "structure",
            "xmlNamespace": { "uri": "http://s3.amazonaws.com/doc/2006-03-01/" },
            "members": { "Status": { "shape": "str" } }
        },
        "GetObjectInput": {
            "type": "structure",
            "required": ["Bucket", "Key"],
            "members": {
                "Bucket": { "shape": "str", "location": "uri", "locationName": "Bucket" },
                "Key": { "shape": "str", "location": "uri", "locationName": "Key" }
            }
        },
        "GetObjectOutput": {
            "type": "structure",
            "payload": "Body",
            "members": {
                "Body": { "shape": "StreamingBody" },
                "ContentType": { "shape": "str", "location": "header", "locationName": "Content-Type" },
                "ContentLength": { "shape": "long", "location": "header", "locationName": "Content-Length" },
                "LastModified": { "shape": "ts", "location": "header", "locationName": "Last-Modified" },
                "Metadata": { "shape": "LabelMap", "location": "headers", "locationName": "x-amz-meta-" }
            }
        },
        "CountOutput": {
            "type": "structure",
            "required": ["Count"],
            "members": { "Count": { "shape": "int" } }
        },
        "MaybeCountOutput": {
            "type": "structure",
            "members": { "Count": { "shape": "int" } }
        },
        "StreamingBody": { "type": "blob", "streaming": true },
        "str": { "type": "string" },
        "int": { "type": "integer" },
        "long": { "type": "long" },
        "bool": { "type": "boolean" },
        "ts": { "type": "timestamp" }
    }
}"#;
